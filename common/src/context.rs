use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// A cancellable scope shared by every task of the process.
///
/// Every clone holds a reference to the scope, [`Handler::cancel`] signals the
/// clones and then waits until all of them have been dropped.
#[derive(Clone, Debug)]
pub struct Context {
	token: CancellationToken,
	_alive: Arc<mpsc::Sender<()>>,
}

#[derive(Debug)]
pub struct Handler {
	token: CancellationToken,
	alive: mpsc::Receiver<()>,
}

impl Context {
	#[must_use]
	pub fn new() -> (Self, Handler) {
		let token = CancellationToken::new();
		let (sender, receiver) = mpsc::channel(1);

		(
			Self {
				token: token.clone(),
				_alive: Arc::new(sender),
			},
			Handler { token, alive: receiver },
		)
	}

	pub async fn done(&self) {
		self.token.cancelled().await
	}

	pub fn is_done(&self) -> bool {
		self.token.is_cancelled()
	}
}

impl Handler {
	/// Resolves once every [`Context`] of this scope has been dropped.
	pub async fn done(&mut self) {
		while self.alive.recv().await.is_some() {}
	}

	pub async fn cancel(mut self) {
		self.token.cancel();
		self.done().await;
	}
}
