pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Forbidden: {message}")]
	Forbidden { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Config error: {message}")]
	Config { message: String },
}
impl From<sift_storage::Error> for Error {
	fn from(err: sift_storage::Error) -> Self {
		match err {
			sift_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			sift_storage::Error::NotFound(message) => Self::NotFound { message },
			other => Self::Storage { message: other.to_string() },
		}
	}
}

impl From<sift_providers::Error> for Error {
	fn from(err: sift_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}

impl From<sift_access::Error> for Error {
	fn from(err: sift_access::Error) -> Self {
		match err {
			sift_access::Error::UnknownRole { .. }
			| sift_access::Error::EntityTypeMismatch { .. } =>
				Self::InvalidRequest { message: err.to_string() },
			other => Self::Config { message: other.to_string() },
		}
	}
}

impl From<sift_access::Denial> for Error {
	fn from(denial: sift_access::Denial) -> Self {
		Self::Forbidden { message: denial.to_string() }
	}
}
