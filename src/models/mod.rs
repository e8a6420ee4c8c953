mod crumb;
mod subscription;
mod topic;
mod user;

pub use crumb::{Comment, Crumb, CrumbRecord, NewCrumb};
pub use subscription::{
    calculate_subscription_price, PlanPrice, SubscriptionFrequency, SubscriptionPlan,
    UserSubscription, DEFAULT_TOPIC_LIMIT,
};
pub use topic::{Topic, TopicSpec};
pub use user::User;
