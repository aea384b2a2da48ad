use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Runtime configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
