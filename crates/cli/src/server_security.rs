use anyhow::{Context as AnyhowContext, Result};
use std::net::SocketAddr;

/// Resolve `bind` and refuse non-loopback addresses unless `public` is set.
///
/// Returns the address to listen on, preferring IPv4.
pub(crate) async fn guarded_bind_addr(bind: &str, public: bool) -> Result<SocketAddr> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host(bind)
        .await
        .with_context(|| format!("Failed to resolve bind address: {bind}"))?
        .collect();
    check_exposure(bind, &addrs, public)?;

    addrs
        .iter()
        .copied()
        .find(SocketAddr::is_ipv4)
        .or_else(|| addrs.first().copied())
        .ok_or_else(|| anyhow::anyhow!("Bind address resolved to zero socket addrs: {bind}"))
}

fn check_exposure(bind: &str, addrs: &[SocketAddr], public: bool) -> Result<()> {
    if addrs.is_empty() {
        anyhow::bail!("Bind address resolved to zero socket addrs: {bind}")
    }
    if !public && addrs.iter().any(|addr| !addr.ip().is_loopback()) {
        anyhow::bail!(
            "Refusing to bind to non-loopback address without --public: {bind}. \
             The search API has no authentication; expose it only behind a trusted proxy."
        )
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loopback_is_allowed_by_default() {
        let addr = guarded_bind_addr("127.0.0.1:0", false).await.unwrap();
        assert!(addr.ip().is_loopback());
    }

    #[tokio::test]
    async fn wildcard_needs_public() {
        assert!(guarded_bind_addr("0.0.0.0:0", false).await.is_err());
        guarded_bind_addr("0.0.0.0:0", true).await.unwrap();
    }

    #[test]
    fn empty_resolution_is_rejected() {
        assert!(check_exposure("nowhere:0", &[], true).is_err());
    }
}
