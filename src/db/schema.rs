pub const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

-- topics table
CREATE TABLE IF NOT EXISTS topics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    slug TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL DEFAULT ''
);

INSERT OR IGNORE INTO topics (name, slug, description) VALUES
    ('world news', 'world-news', 'Headlines and reporting from around the world'),
    ('music', 'music', 'Artists, albums and music news'),
    ('sports and fitness', 'sports-and-fitness', 'Results, athletes and training trends'),
    ('stock crypto finance', 'stock-crypto-finance', 'Markets, stocks, crypto and the economy'),
    ('food and drink', 'food-and-drink', 'Recipes, meals and ingredients'),
    ('technology', 'technology', 'Software, hardware and gadgets'),
    ('plants and gardening', 'plants-and-gardening', 'Plant care and growing guides'),
    ('environment', 'environment', 'Climate, sustainability and biodiversity'),
    ('trivia and fun', 'trivia-and-fun', 'Facts, jokes and oddities');

-- crumbs table
CREATE TABLE IF NOT EXISTS crumbs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    summary TEXT NOT NULL DEFAULT '',
    url TEXT NOT NULL,
    source TEXT NOT NULL,
    topic_id INTEGER NOT NULL REFERENCES topics(id) ON DELETE CASCADE,
    published_at TEXT NOT NULL,
    added_on TEXT NOT NULL,
    UNIQUE(title, url)
);

CREATE INDEX IF NOT EXISTS idx_crumbs_published_at ON crumbs(published_at DESC);
CREATE INDEX IF NOT EXISTS idx_crumbs_topic_id ON crumbs(topic_id);

-- crumb_tags table (additional topics detected by the tagger)
CREATE TABLE IF NOT EXISTS crumb_tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    crumb_id INTEGER NOT NULL REFERENCES crumbs(id) ON DELETE CASCADE,
    tag TEXT NOT NULL,
    UNIQUE(crumb_id, tag)
);

-- users table
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL UNIQUE,
    date_joined TEXT NOT NULL
);

-- user_topics table (topic preferences)
CREATE TABLE IF NOT EXISTS user_topics (
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    topic_id INTEGER NOT NULL REFERENCES topics(id) ON DELETE CASCADE,
    PRIMARY KEY (user_id, topic_id)
);

-- subscription_plans table
CREATE TABLE IF NOT EXISTS subscription_plans (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    topic_limit INTEGER
);

INSERT OR IGNORE INTO subscription_plans (name, topic_limit) VALUES
    ('basic', 2),
    ('premium', NULL);

-- subscription_frequencies table
CREATE TABLE IF NOT EXISTS subscription_frequencies (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    duration_days INTEGER NOT NULL,
    discount_percent INTEGER NOT NULL DEFAULT 0
);

INSERT OR IGNORE INTO subscription_frequencies (name, duration_days, discount_percent) VALUES
    ('weekly', 7, 0),
    ('monthly', 30, 10),
    ('annually', 365, 30);

-- user_subscriptions table (one row per user, reconciled by the payment webhook)
CREATE TABLE IF NOT EXISTS user_subscriptions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
    plan_id INTEGER NOT NULL REFERENCES subscription_plans(id),
    frequency_id INTEGER NOT NULL REFERENCES subscription_frequencies(id),
    start_date TEXT NOT NULL,
    end_date TEXT NOT NULL,
    active INTEGER NOT NULL DEFAULT 1,
    payment_intent_id TEXT UNIQUE
);

-- saved_crumbs table
CREATE TABLE IF NOT EXISTS saved_crumbs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    crumb_id INTEGER NOT NULL REFERENCES crumbs(id) ON DELETE CASCADE,
    saved_at TEXT NOT NULL,
    UNIQUE(user_id, crumb_id)
);

-- comments table
CREATE TABLE IF NOT EXISTS comments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    crumb_id INTEGER NOT NULL REFERENCES crumbs(id) ON DELETE CASCADE,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_comments_crumb_id ON comments(crumb_id);
"#;
