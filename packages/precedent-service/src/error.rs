pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	Validation { message: String },
	#[error("Rate limit exceeded: {message}")]
	RateLimitExceeded {
		message: String,
		#[source]
		source: Option<Box<precedent_providers::Error>>,
	},
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Index unavailable: {message}")]
	IndexUnavailable { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Operation cancelled.")]
	Cancelled,
}
impl Error {
	pub(crate) fn validation(message: impl Into<String>) -> Self {
		Self::Validation { message: message.into() }
	}
}
impl From<precedent_providers::Error> for Error {
	fn from(err: precedent_providers::Error) -> Self {
		if err.is_throttled() {
			return Self::RateLimitExceeded {
				message: "Embedding provider throttled the request.".to_string(),
				source: Some(Box::new(err)),
			};
		}

		Self::Provider { message: err.to_string() }
	}
}
impl From<precedent_storage::Error> for Error {
	fn from(err: precedent_storage::Error) -> Self {
		match err {
			precedent_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			precedent_storage::Error::InvalidArgument(message) => Self::Validation { message },
			precedent_storage::Error::Qdrant(inner) =>
				Self::IndexUnavailable { message: inner.to_string() },
		}
	}
}
impl From<precedent_domain::InvalidTenantId> for Error {
	fn from(err: precedent_domain::InvalidTenantId) -> Self {
		Self::validation(err.to_string())
	}
}
impl From<precedent_domain::RecordRejectCode> for Error {
	fn from(err: precedent_domain::RecordRejectCode) -> Self {
		Self::validation(err.to_string())
	}
}
