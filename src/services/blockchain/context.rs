//! Per-call cancellation and deadline.
//!
//! Every client operation receives a [`CallContext`]. Cancelling its token or passing its
//! deadline aborts the in-flight request by dropping its future.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::services::blockchain::BlockChainError;

#[derive(Debug, Clone, Default)]
pub struct CallContext {
	token: CancellationToken,
	deadline: Option<Instant>,
}

impl CallContext {
	/// A context that is never cancelled and has no deadline
	pub fn background() -> Self {
		Self::default()
	}

	pub fn with_timeout(timeout: Duration) -> Self {
		Self::with_deadline(Instant::now() + timeout)
	}

	pub fn with_deadline(deadline: Instant) -> Self {
		Self {
			token: CancellationToken::new(),
			deadline: Some(deadline),
		}
	}

	/// A context cancelled together with `token`
	pub fn with_cancellation(token: CancellationToken) -> Self {
		Self {
			token,
			deadline: None,
		}
	}

	/// Derives a context cancelled with this one and bounded by the earlier of both deadlines
	pub fn child_with_timeout(&self, timeout: Duration) -> Self {
		let deadline = Instant::now() + timeout;
		Self {
			token: self.token.child_token(),
			deadline: Some(match self.deadline {
				Some(current) => current.min(deadline),
				None => deadline,
			}),
		}
	}

	pub fn token(&self) -> &CancellationToken {
		&self.token
	}

	pub fn deadline(&self) -> Option<Instant> {
		self.deadline
	}

	pub fn cancel(&self) {
		self.token.cancel();
	}

	pub fn is_cancelled(&self) -> bool {
		self.token.is_cancelled()
	}

	/// Fails if the context is cancelled or past its deadline
	pub fn check(&self) -> Result<(), BlockChainError> {
		if self.token.is_cancelled() {
			return Err(BlockChainError::cancelled());
		}
		if matches!(self.deadline, Some(deadline) if Instant::now() >= deadline) {
			return Err(BlockChainError::deadline_exceeded());
		}
		Ok(())
	}

	/// Runs `fut` until it completes, the context is cancelled or the deadline passes
	pub async fn run<F, T>(&self, fut: F) -> Result<T, BlockChainError>
	where
		F: Future<Output = Result<T, BlockChainError>>,
	{
		self.check()?;

		let deadline = async {
			match self.deadline {
				Some(deadline) => tokio::time::sleep_until(deadline).await,
				None => std::future::pending::<()>().await,
			}
		};

		tokio::select! {
			biased;
			_ = self.token.cancelled() => Err(BlockChainError::cancelled()),
			_ = deadline => Err(BlockChainError::deadline_exceeded()),
			result = fut => result,
		}
	}

	/// Sleeps for `duration` unless the context ends first
	pub async fn sleep(&self, duration: Duration) -> Result<(), BlockChainError> {
		self.run(async {
			tokio::time::sleep(duration).await;
			Ok(())
		})
		.await
	}
}
