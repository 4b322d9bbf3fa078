//! Loopback HTTP listener that captures the consent redirect.
//!
//! The listener serves [`REDIRECT_PATH`] with a small HTML page and answers every other path
//! (browsers like to ask for `/favicon.ico`) with a 404. Connections are handled concurrently,
//! so an idle or half-open connection never holds up the real callback. The first request
//! that reaches the redirect path is handed back and the server shuts down.

// std
use std::{
	io,
	net::{Ipv4Addr, SocketAddr},
	time::Duration as StdDuration,
};
// crates.io
use axum::{
	Router,
	extract::{Query, State},
	response::{Html, IntoResponse},
	routing::get,
};
use tokio::{net::TcpListener, sync::oneshot};
// self
use crate::{
	_prelude::*,
	flows::{AuthorizationCallback, REDIRECT_PATH, loopback_redirect_uri},
};

const SHUTDOWN_GRACE: StdDuration = StdDuration::from_secs(2);
const SUCCESS_PAGE: &str = "<!doctype html><html><body><h1>Authorization received</h1>\
	<p>You can close this window and return to the terminal.</p></body></html>";
const DENIED_PAGE: &str = "<!doctype html><html><body><h1>Authorization not granted</h1>\
	<p>Return to the terminal for details.</p></body></html>";
const NOT_FOUND_PAGE: &str = "<!doctype html><html><body><h1>Not found</h1></body></html>";

/// Listener bound to `127.0.0.1` that waits for the provider's redirect.
#[derive(Debug)]
pub struct RedirectListener {
	listener: TcpListener,
	redirect_uri: Url,
}
impl RedirectListener {
	/// Binds to `127.0.0.1:<port>`; port `0` picks an ephemeral port.
	pub async fn bind(port: u16) -> Result<Self> {
		let listener = TcpListener::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, port)))
			.await
			.map_err(ConfigError::RedirectListener)?;
		let bound = listener.local_addr().map_err(ConfigError::RedirectListener)?;
		let redirect_uri = loopback_redirect_uri(bound.port())?;

		tracing::debug!(addr = %bound, "Redirect listener bound.");

		Ok(Self { listener, redirect_uri })
	}

	/// Redirect URI to register in the authorize URL.
	pub fn redirect_uri(&self) -> &Url {
		&self.redirect_uri
	}

	/// Serves until a request hits the redirect path and returns its parameters.
	pub async fn accept_callback(self) -> Result<AuthorizationCallback> {
		let (callback_tx, callback_rx) = oneshot::channel();
		let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
		let app = Router::new()
			.route(REDIRECT_PATH, get(receive_callback))
			.fallback(not_found)
			.with_state(CallbackSender(Arc::new(Mutex::new(Some(callback_tx)))));
		let server = tokio::spawn(async move {
			axum::serve(self.listener, app)
				.with_graceful_shutdown(async move {
					let _ = shutdown_rx.await;
				})
				.await
		});
		let received = callback_rx.await;

		let _ = shutdown_tx.send(());

		match received {
			Ok(callback) => {
				let abort = server.abort_handle();

				if tokio::time::timeout(SHUTDOWN_GRACE, server).await.is_err() {
					tracing::debug!("Redirect listener left open connections behind.");

					abort.abort();
				}

				Ok(callback)
			},
			Err(_) => {
				let source = match server.await {
					Ok(Err(err)) => err,
					Ok(Ok(())) => io::Error::other("redirect listener stopped before the callback"),
					Err(err) => io::Error::other(err),
				};

				Err(ConfigError::RedirectListener(source).into())
			},
		}
	}
}

#[derive(Clone)]
struct CallbackSender(Arc<Mutex<Option<oneshot::Sender<AuthorizationCallback>>>>);

async fn receive_callback(
	State(sender): State<CallbackSender>,
	Query(callback): Query<AuthorizationCallback>,
) -> Html<&'static str> {
	let page = if callback.error.is_some() { DENIED_PAGE } else { SUCCESS_PAGE };

	match sender.0.lock().take() {
		Some(sender) => {
			let _ = sender.send(callback);
		},
		None => tracing::debug!("Ignoring a repeated redirect callback."),
	}

	Html(page)
}

async fn not_found() -> impl IntoResponse {
	(StatusCode::NOT_FOUND, Html(NOT_FOUND_PAGE))
}

#[cfg(test)]
mod tests {
	// crates.io
	use tokio::{
		io::{AsyncReadExt, AsyncWriteExt},
		net::TcpStream,
	};
	// self
	use super::*;

	fn bound_addr(listener: &RedirectListener) -> SocketAddr {
		let port = listener.redirect_uri().port().expect("Redirect URI should carry the port.");

		SocketAddr::from((Ipv4Addr::LOCALHOST, port))
	}

	async fn send(addr: SocketAddr, target: &str) -> String {
		let mut stream = TcpStream::connect(addr).await.expect("Listener should accept.");
		let request =
			format!("GET {target} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
		let mut response = String::new();

		stream.write_all(request.as_bytes()).await.expect("Request should be written.");
		stream.read_to_string(&mut response).await.expect("Response should be readable.");

		response
	}

	#[tokio::test]
	async fn captures_callback_after_ignoring_other_paths() {
		let listener = RedirectListener::bind(0).await.expect("Listener should bind.");
		let addr = bound_addr(&listener);

		assert_ne!(addr.port(), 0);

		let client = tokio::spawn(async move {
			let favicon = send(addr, "/favicon.ico").await;
			let callback = send(addr, "/exchange_token?state=s1&code=c1&scope=read").await;

			(favicon, callback)
		});
		let callback = listener.accept_callback().await.expect("Callback should be captured.");
		let (favicon, page) = client.await.expect("Client task should finish.");

		assert_eq!(callback.code.as_deref(), Some("c1"));
		assert_eq!(callback.state.as_deref(), Some("s1"));
		assert!(favicon.starts_with("HTTP/1.1 404"));
		assert!(page.starts_with("HTTP/1.1 200"));
		assert!(page.contains("Authorization received"));
	}

	#[tokio::test]
	async fn idle_connection_does_not_block_the_callback() {
		let listener = RedirectListener::bind(0).await.expect("Listener should bind.");
		let addr = bound_addr(&listener);
		let idle = TcpStream::connect(addr).await.expect("Idle connection should open.");
		let client = tokio::spawn(async move { send(addr, "/exchange_token?state=s&code=c").await });
		let callback = tokio::time::timeout(StdDuration::from_secs(5), listener.accept_callback())
			.await
			.expect("Callback should arrive while another connection sits idle.")
			.expect("Callback should be captured.");
		let page = client.await.expect("Client task should finish.");

		assert_eq!(callback.code.as_deref(), Some("c"));
		assert!(page.contains("Authorization received"));

		drop(idle);
	}
}
