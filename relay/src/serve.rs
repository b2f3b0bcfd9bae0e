use std::net::{IpAddr, SocketAddr};

use axum::Router;
use if_addrs::get_if_addrs;
use tokio::net::{TcpListener, ToSocketAddrs};

/// Bind and serve until Ctrl+C or SIGTERM, recording each peer address for handlers.
pub async fn serve<A: ToSocketAddrs>(addr: A, router: Router) -> std::io::Result<()> {
    let tcp_listener = TcpListener::bind(addr).await?;
    print_listener_urls(&tcp_listener);

    axum::serve(
        tcp_listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
}

fn print_listener_urls(listener: &TcpListener) {
    let addr = match listener.local_addr() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::warn!("could not determine the listening address: {e}");
            return;
        }
    };

    let port = addr.port();
    tracing::info!("Listening on port {}", port);
    match addr {
        SocketAddr::V4(addr4) if addr4.ip().is_unspecified() => {
            get_interface_ips(false).for_each(|ip| print_addr(ip, port))
        }
        SocketAddr::V6(addr6) if addr6.ip().is_unspecified() => {
            get_interface_ips(true).for_each(|ip| print_addr(ip, port))
        }
        _ => print_addr(addr.ip(), port),
    }
}

fn get_interface_ips(ipv6: bool) -> impl Iterator<Item = IpAddr> {
    get_if_addrs()
        .into_iter()
        .flatten()
        .map(|i| i.ip())
        .filter(move |ip| ip.is_ipv6() == ipv6)
}

fn print_addr(addr: IpAddr, port: u16) {
    match addr {
        _ if addr.is_loopback() => tracing::info!("➜  Local:   http://localhost:{}", port),
        IpAddr::V4(_) => tracing::info!("➜  Network: http://{}:{}", addr, port),
        // Enclose IPv6 addresses in square brackets
        IpAddr::V6(_) => tracing::info!("➜  Network: http://[{}]:{}", addr, port),
    }
}

pub async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutting down");
}
