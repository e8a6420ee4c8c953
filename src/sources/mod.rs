mod fetcher;
mod payloads;

pub use fetcher::Fetcher;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;
use crate::pipeline::handler::Domain;

/// Every upstream API crumbs are ingested from, in ingestion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    NewsDataWorld,
    NewsApiWorld,
    LastFmArtists,
    NewsDataMusic,
    TheNewsApiSports,
    NewsDataFitness,
    FinnhubNews,
    SpoonacularRecipes,
    MediastackTech,
    PerenualGuides,
    TreflePlants,
    PermaPeoplePlants,
    NewsDataEnvironment,
    UselessFacts,
    ChuckNorrisJokes,
}

impl Source {
    pub const ALL: [Source; 15] = [
        Source::NewsDataWorld,
        Source::NewsApiWorld,
        Source::LastFmArtists,
        Source::NewsDataMusic,
        Source::TheNewsApiSports,
        Source::NewsDataFitness,
        Source::FinnhubNews,
        Source::SpoonacularRecipes,
        Source::MediastackTech,
        Source::PerenualGuides,
        Source::TreflePlants,
        Source::PermaPeoplePlants,
        Source::NewsDataEnvironment,
        Source::UselessFacts,
        Source::ChuckNorrisJokes,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Source::NewsDataWorld => "newsdata-world",
            Source::NewsApiWorld => "newsapi-world",
            Source::LastFmArtists => "lastfm-artists",
            Source::NewsDataMusic => "newsdata-music",
            Source::TheNewsApiSports => "thenewsapi-sports",
            Source::NewsDataFitness => "newsdata-fitness",
            Source::FinnhubNews => "finnhub-news",
            Source::SpoonacularRecipes => "spoonacular-recipes",
            Source::MediastackTech => "mediastack-tech",
            Source::PerenualGuides => "perenual-guides",
            Source::TreflePlants => "trefle-plants",
            Source::PermaPeoplePlants => "permapeople-plants",
            Source::NewsDataEnvironment => "newsdata-environment",
            Source::UselessFacts => "useless-facts",
            Source::ChuckNorrisJokes => "chucknorris-jokes",
        }
    }

    pub fn domain(self) -> Domain {
        match self {
            Source::NewsDataWorld | Source::NewsApiWorld => Domain::WorldNews,
            Source::LastFmArtists | Source::NewsDataMusic => Domain::Music,
            Source::TheNewsApiSports | Source::NewsDataFitness => Domain::SportsFitness,
            Source::FinnhubNews => Domain::Finance,
            Source::SpoonacularRecipes => Domain::Food,
            Source::MediastackTech => Domain::Technology,
            Source::PerenualGuides | Source::TreflePlants | Source::PermaPeoplePlants => {
                Domain::Plants
            }
            Source::NewsDataEnvironment => Domain::Environment,
            Source::UselessFacts | Source::ChuckNorrisJokes => Domain::Trivia,
        }
    }

    /// Source name stored on a crumb when the payload does not carry one.
    pub fn default_name(self) -> &'static str {
        match self {
            Source::NewsDataWorld => "NewsData.io World News",
            Source::NewsApiWorld => "NewsAPI.org",
            Source::LastFmArtists => "Last.fm",
            Source::NewsDataMusic => "NewsData.io Music",
            Source::TheNewsApiSports => "TheNewsAPI",
            Source::NewsDataFitness => "NewsData.io Fitness",
            Source::FinnhubNews => "Finnhub",
            Source::SpoonacularRecipes => "Spoonacular",
            Source::MediastackTech => "Mediastack",
            Source::PerenualGuides => "Perenual",
            Source::TreflePlants => "Trefle",
            Source::PermaPeoplePlants => "PermaPeople",
            Source::NewsDataEnvironment => "NewsData.io Environment",
            Source::UselessFacts => "Useless Facts",
            Source::ChuckNorrisJokes => "Chuck Norris API",
        }
    }

    pub fn timeout(self) -> Duration {
        match self.domain() {
            Domain::Plants | Domain::Trivia => Duration::from_secs(10),
            _ => Duration::from_secs(15),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Source {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Source::ALL
            .into_iter()
            .find(|source| source.id() == s.trim())
            .ok_or_else(|| AppError::NotFound(format!("Unknown source {:?}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_through_from_str() {
        for source in Source::ALL {
            assert_eq!(source.id().parse::<Source>().unwrap(), source);
        }
        assert!("bbc".parse::<Source>().is_err());
    }

    #[test]
    fn plant_and_trivia_apis_use_shorter_timeout() {
        assert_eq!(Source::TreflePlants.timeout(), Duration::from_secs(10));
        assert_eq!(Source::ChuckNorrisJokes.timeout(), Duration::from_secs(10));
        assert_eq!(Source::FinnhubNews.timeout(), Duration::from_secs(15));
    }

    #[test]
    fn every_domain_has_a_source() {
        use std::collections::HashSet;
        let domains: HashSet<Domain> = Source::ALL.iter().map(|s| s.domain()).collect();
        assert_eq!(domains.len(), 9);
    }
}
