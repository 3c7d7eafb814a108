pub mod calendar;
pub mod catalog;
pub mod model_client;
pub mod quota;
pub mod recommend;
pub mod reference;

pub use model_client::ModelServerClient;
pub use model_client::RecommendationModel;
