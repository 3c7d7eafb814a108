pub mod calendar;
pub mod movie;
pub mod recommend;
pub mod user;

pub use calendar::{CalendarEntry, CalendarEntryResponse, UpsertEntryRequest};
pub use movie::{Keyword, Movie, MovieSummary, NewMovie};
pub use recommend::{
    ModelCandidate, ModelRecommendResponse, Recommendation, RecommendByTextRequest,
    RecommendResponse, RecommendedMovie,
};
pub use user::User;
