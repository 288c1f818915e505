use std::time::Duration;

use anyhow::Context;
use time::OffsetDateTime;

/// Token lifetime used when `JWT_EXPIRES_IN` is not set.
pub const DEFAULT_TOKEN_TTL: &str = "60h";

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let secret = std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        anyhow::ensure!(!secret.is_empty(), "JWT_SECRET must not be empty");

        let ttl_raw =
            std::env::var("JWT_EXPIRES_IN").unwrap_or_else(|_| DEFAULT_TOKEN_TTL.to_string());
        let ttl = parse_ttl(&ttl_raw).with_context(|| format!("invalid JWT_EXPIRES_IN {ttl_raw:?}"))?;

        Ok(Self {
            database_url,
            jwt: JwtConfig { secret, ttl },
        })
    }
}

/// Parses a token lifetime such as `60h`, `30m`, `7d` or `3600` (bare seconds).
///
/// Token timestamps are whole seconds, so `ms` amounts round up to the next second.
pub fn parse_ttl(raw: &str) -> anyhow::Result<Duration> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);

    anyhow::ensure!(!digits.is_empty(), "missing amount");
    let amount: u64 = digits.parse().context("amount out of range")?;

    let ttl = match unit.trim() {
        "ms" => Duration::from_secs(amount.div_ceil(1000)),
        unit => {
            let secs_per_unit: u64 = match unit {
                "" | "s" => 1,
                "m" => 60,
                "h" => 60 * 60,
                "d" => 60 * 60 * 24,
                "w" => 60 * 60 * 24 * 7,
                other => anyhow::bail!("unknown unit {other:?}"),
            };
            let secs = amount
                .checked_mul(secs_per_unit)
                .context("duration overflow")?;
            Duration::from_secs(secs)
        }
    };

    anyhow::ensure!(!ttl.is_zero(), "duration must be positive");
    let expiry = time::Duration::try_from(ttl).context("duration out of range")?;
    anyhow::ensure!(
        OffsetDateTime::now_utc().checked_add(expiry).is_some(),
        "token expiry would be out of range"
    );
    Ok(ttl)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_default_ttl() {
        let ttl = parse_ttl(DEFAULT_TOKEN_TTL).expect("default parses");
        assert_eq!(ttl, Duration::from_secs(60 * 60 * 60));
    }

    #[test]
    fn parses_units_and_bare_seconds() {
        assert_eq!(parse_ttl("90").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_ttl("45s").unwrap(), Duration::from_secs(45));
        assert_eq!(parse_ttl("30m").unwrap(), Duration::from_secs(1800));
        assert_eq!(parse_ttl("2d").unwrap(), Duration::from_secs(172_800));
        assert_eq!(parse_ttl("1w").unwrap(), Duration::from_secs(604_800));
        assert_eq!(parse_ttl("2000ms").unwrap(), Duration::from_secs(2));
    }

    #[test]
    fn millis_round_up_to_whole_seconds() {
        assert_eq!(parse_ttl("1ms").unwrap(), Duration::from_secs(1));
        assert_eq!(parse_ttl("500ms").unwrap(), Duration::from_secs(1));
        assert_eq!(parse_ttl("1500ms").unwrap(), Duration::from_secs(2));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_ttl("").is_err());
        assert!(parse_ttl("h").is_err());
        assert!(parse_ttl("10y").is_err());
        assert!(parse_ttl("0h").is_err());
        assert!(parse_ttl("0ms").is_err());
        assert!(parse_ttl("999999999999h").is_err());
        assert!(parse_ttl("18446744073709551615").is_err());
    }
}
