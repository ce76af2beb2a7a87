use derive_more::{Display, From};

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Display, From)]
pub enum Error {
    #[display("{_0}")]
    #[from(String, &String, &str)]
    Custom(String),

    // -- Externals
    #[display("io error: {_0}")]
    #[from]
    Io(std::io::Error),

    #[display("http error: {_0}")]
    #[from]
    Http(reqwest::Error),

    #[display("json error: {_0}")]
    #[from]
    Json(serde_json::Error),

    #[display("openai error: {_0}")]
    #[from]
    OpenAi(async_openai::error::OpenAIError),

    #[display("xlsx error: {_0}")]
    #[from]
    Xlsx(rust_xlsxwriter::XlsxError),
}

impl Error {
    pub fn custom(val: impl Into<String>) -> Self {
        Self::Custom(val.into())
    }

    pub fn custom_from_err(err: impl std::error::Error) -> Self {
        Self::Custom(err.to_string())
    }
}

impl std::error::Error for Error {}
