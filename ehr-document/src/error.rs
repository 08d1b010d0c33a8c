use thiserror::Error;

#[derive(Debug, Error)]
pub enum EhrError {
    #[error("template parse error: {0}")]
    TemplateParse(String),

    #[error("template rendering failed: {0}")]
    TemplateRender(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<tera::Error> for EhrError {
    fn from(e: tera::Error) -> Self {
        EhrError::TemplateRender(e.to_string())
    }
}

pub type EhrResult<T> = Result<T, EhrError>;
