pub mod config;
pub mod constants;
pub mod errors;
pub mod event;
pub mod key;
pub mod pipeline;
pub mod response;
pub mod storage;
pub mod transform;
pub mod validation;
pub mod viewer;

// 公開API
pub use config::{AccessCredentials, DerivativeConfig, StorageConfig};
pub use constants::{DEFAULT_QUALITY, MAX_DIMENSION, MAX_INPUT_SIZE, MAX_PIXELS};
pub use errors::{ConfigError, ParseError, StorageError, TransformError};
pub use event::{MissEvent, OriginResponseHandler};
pub use key::{DerivativeKey, DerivativeRequest, KeyParser, parse};
pub use pipeline::{DerivativePipeline, PipelineOutcome};
pub use response::{BodyEncoding, HeaderEntry, ResponseDescriptor, build};
pub use storage::{MemoryStore, ObjectMetadata, ObjectStore, StorageProxyClient};
pub use transform::{ImageCrateTransform, ImageTransform, OutputFormat};
pub use validation::validate_key;
pub use viewer::{Dimension, ViewerRewrite};
