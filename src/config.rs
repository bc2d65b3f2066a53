//! 환경 변수 기반 설정 관리

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// 서버 설정
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: String,
    /// 비어 있으면 모든 Origin 허용
    pub cors_origins: Vec<String>,
    pub room: RoomConfig,
    pub snapshot: SnapshotConfig,
    pub connection: ConnectionConfig,
    pub log_level: String,
}

/// 방 설정
#[derive(Debug, Clone)]
pub struct RoomConfig {
    pub max_rooms_per_connection: usize,
}

/// 스냅샷 저장소 설정
#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    /// `None`이면 스냅샷 조회 비활성화
    pub base_url: Option<String>,
    pub timeout: Duration,
}

/// 연결별 설정
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub outbound_buffer: usize,
    pub max_message_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5000,
            host: "0.0.0.0".to_string(),
            cors_origins: Vec::new(),
            room: RoomConfig {
                max_rooms_per_connection: 32,
            },
            snapshot: SnapshotConfig {
                base_url: None,
                timeout: Duration::from_millis(3000),
            },
            connection: ConnectionConfig {
                outbound_buffer: 256,
                max_message_bytes: 16 * 1024 * 1024,
            },
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// 환경 변수에서 설정 로드
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 임의의 조회 함수로 설정 구성 (잘못된 값은 기본값으로 대체)
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            port: parse_or(&lookup, "PORT", defaults.port),
            host: lookup("HOST").unwrap_or(defaults.host),
            cors_origins: lookup("CORS_ORIGINS")
                .map(|v| parse_origins(&v))
                .unwrap_or(defaults.cors_origins),
            room: RoomConfig {
                max_rooms_per_connection: parse_or(
                    &lookup,
                    "MAX_ROOMS_PER_CONNECTION",
                    defaults.room.max_rooms_per_connection,
                )
                .max(1),
            },
            snapshot: SnapshotConfig {
                base_url: lookup("SNAPSHOT_URL")
                    .map(|v| v.trim().trim_end_matches('/').to_string())
                    .filter(|v| !v.is_empty()),
                timeout: lookup("SNAPSHOT_TIMEOUT_MS")
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.snapshot.timeout),
            },
            connection: ConnectionConfig {
                outbound_buffer: parse_or(
                    &lookup,
                    "OUTBOUND_BUFFER",
                    defaults.connection.outbound_buffer,
                )
                .max(1),
                max_message_bytes: parse_or(
                    &lookup,
                    "MAX_MESSAGE_BYTES",
                    defaults.connection.max_message_bytes,
                )
                .max(1),
            },
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

// "*" 는 전체 허용
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && s != "*")
        .collect()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
