pub mod mock_feature_server;
pub mod mock_sources;

pub use mock_feature_server::{MockFeatureServer, MockReply};
pub use mock_sources::{city, continent, MockFeatureSource};
