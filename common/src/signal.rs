use std::future::poll_fn;
use std::task::Poll;

use tokio::signal::unix::{Signal, SignalKind};

/// Listens to a set of unix signals and yields whichever arrives first.
#[derive(Default)]
pub struct SignalHandler {
	signals: Vec<(SignalKind, Signal)>,
}

impl SignalHandler {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_signal(mut self, kind: SignalKind) -> Self {
		if self.signals.iter().any(|(k, _)| *k == kind) {
			return self;
		}

		let signal = tokio::signal::unix::signal(kind).expect("failed to create signal");
		self.signals.push((kind, signal));
		self
	}

	/// Pends forever when no signal was registered.
	pub async fn recv(&mut self) -> SignalKind {
		poll_fn(|cx| {
			for (kind, signal) in self.signals.iter_mut() {
				if signal.poll_recv(cx).is_ready() {
					return Poll::Ready(*kind);
				}
			}

			Poll::Pending
		})
		.await
	}
}
