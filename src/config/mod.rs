use std::env;
use std::net::SocketAddr;

pub mod cors;
pub mod media_type;

pub use cors::create_cors_layer;
pub use media_type::create_media_type_layer;

const DEFAULT_BIND_ADDR: ([u8; 4], u16) = ([0, 0, 0, 0], 3001);

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub allowed_origins: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/gatehouse".to_string()),
            bind_addr: parse_bind_addr(env::var("BIND_ADDR").ok().as_deref()),
            allowed_origins: env::var("CORS_ALLOWED_ORIGINS").unwrap_or_default(),
        }
    }
}

fn parse_bind_addr(value: Option<&str>) -> SocketAddr {
    match value {
        Some(addr) => addr.parse().unwrap_or_else(|_| {
            tracing::warn!("Config: Invalid BIND_ADDR '{}', using default", addr);
            SocketAddr::from(DEFAULT_BIND_ADDR)
        }),
        None => SocketAddr::from(DEFAULT_BIND_ADDR),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bind_addr_parses() {
        let addr = SocketAddr::from(DEFAULT_BIND_ADDR);
        assert_eq!(addr.port(), 3001);
    }

    #[test]
    fn test_bind_addr_accepts_valid_value() {
        let addr = parse_bind_addr(Some("127.0.0.1:8080"));
        assert_eq!(addr, "127.0.0.1:8080".parse().unwrap());
    }

    #[test]
    fn test_invalid_bind_addr_falls_back_to_default() {
        let addr = parse_bind_addr(Some("not-an-address"));
        assert_eq!(addr, SocketAddr::from(DEFAULT_BIND_ADDR));
    }

    #[test]
    fn test_absent_bind_addr_uses_default() {
        let addr = parse_bind_addr(None);
        assert_eq!(addr, SocketAddr::from(DEFAULT_BIND_ADDR));
    }
}
