use inference::Pipeline;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    /// `None` when the model failed to load at startup.
    pub pipeline: Option<Arc<Pipeline>>,
    /// Multipart field carrying the uploaded image.
    pub upload_field: Arc<str>,
}

impl AppState {
    pub fn new(pipeline: Option<Arc<Pipeline>>, upload_field: &str) -> Self {
        Self {
            pipeline,
            upload_field: Arc::from(upload_field),
        }
    }
}
