//! Built-in manifest for the `finance` database.
//!
//! Used when no manifest file is given on the command line.

use crate::auth::CredentialRef;

use super::types::{CollectionSpec, Grant, IndexSpec, KeyPattern, PrincipalSpec, SchemaManifest};

/// Database provisioned by the built-in manifest.
pub const FINANCE_DATABASE: &str = "finance";

/// Application principal created by the built-in manifest.
pub const FINANCE_PRINCIPAL: &str = "quant_user";

/// Environment variable holding the application principal's password.
pub const FINANCE_PRINCIPAL_PASSWORD_ENV: &str = "QUANT_USER_PASSWORD";

/// Minute bars expire after 90 days.
pub const MINUTE_BAR_RETENTION_SECONDS: u64 = 90 * 24 * 60 * 60;

fn idx(keys: KeyPattern) -> IndexSpec {
    IndexSpec::new(keys).background()
}

/// Returns the built-in manifest.
pub fn builtin_manifest() -> SchemaManifest {
    let k = KeyPattern::new;

    let collections = vec![
        // Minute-level market bars
        CollectionSpec::new("minute_bars")
            .index(idx(k().asc("symbol").asc("datetime")).unique())
            .index(idx(k().asc("symbol").asc("trade_date")))
            .index(idx(k().asc("datetime")).ttl(MINUTE_BAR_RETENTION_SECONDS)),
        // Daily aggregates
        CollectionSpec::new("volume_price")
            .index(idx(k().asc("symbol").asc("trade_date")).unique())
            .index(idx(k().asc("trade_date"))),
        CollectionSpec::new("trade_signals")
            .index(idx(k().asc("symbol").desc("timestamp")))
            .index(idx(k().asc("status").desc("timestamp")))
            .index(idx(k().asc("order_id")).unique()),
        CollectionSpec::new("backtest_trades").index(idx(k().asc("symbol").desc("datetime"))),
        CollectionSpec::new("strategy_states")
            .index(idx(k().asc("symbol").asc("strategy_name").asc("user_id")).unique())
            .index(idx(k().desc("timestamp"))),
        CollectionSpec::new("positions").index(idx(k().asc("symbol").desc("timestamp"))),
        // Worker runtime status, one document per symbol
        CollectionSpec::new("runtime_status")
            .index(idx(k().asc("symbol")).unique())
            .index(idx(k().asc("status").desc("updated_at"))),
        CollectionSpec::new("watchlist_strategies")
            .index(idx(k().asc("symbol").asc("strategy_key").asc("user_id")).unique())
            .index(idx(k().asc("user_id").asc("active"))),
    ];

    SchemaManifest {
        database: FINANCE_DATABASE.to_string(),
        principal: PrincipalSpec {
            name: FINANCE_PRINCIPAL.to_string(),
            credential: CredentialRef::env(FINANCE_PRINCIPAL_PASSWORD_ENV),
            grants: vec![Grant::new("readWrite", FINANCE_DATABASE)],
        },
        collections,
    }
}
