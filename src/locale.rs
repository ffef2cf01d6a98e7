//! Locale-prefixed routing and per-locale price display.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static LOCALE_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/(es|pt|en)(/|$)").expect("locale prefix regex"));

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Es,
    Pt,
    En,
}

impl Locale {
    pub const SUPPORTED: [Locale; 3] = [Locale::Es, Locale::Pt, Locale::En];

    pub fn as_str(self) -> &'static str {
        match self {
            Locale::Es => "es",
            Locale::Pt => "pt",
            Locale::En => "en",
        }
    }

    pub fn currency(self, rates: &HashMap<String, f64>) -> Currency {
        let rate = |code: &str| rates.get(code).copied().unwrap_or(1.0);
        match self {
            Locale::Es => Currency {
                code: "ARS",
                rate: rate("ARS"),
            },
            Locale::Pt => Currency {
                code: "BRL",
                rate: rate("BRL"),
            },
            Locale::En => Currency {
                code: "USD",
                rate: 1.0,
            },
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Locale {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "es" => Ok(Locale::Es),
            "pt" => Ok(Locale::Pt),
            "en" => Ok(Locale::En),
            other => Err(anyhow!("unsupported locale: {other}")),
        }
    }
}

/// First supported two-letter code in an `Accept-Language` header.
///
/// Codes are matched as written: `PT-BR` is not `pt`.
pub fn detect_locale(accept_language: &str) -> Locale {
    accept_language
        .split(',')
        .map(|part| part.split(';').next().unwrap_or_default().trim())
        .filter_map(|tag| tag.get(..2))
        .find_map(|code| Locale::SUPPORTED.into_iter().find(|l| l.as_str() == code))
        .unwrap_or_default()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouteDecision {
    Pass,
    Redirect(String),
}

pub fn route(path: &str, accept_language: &str) -> RouteDecision {
    if path.starts_with("/_next") || path.starts_with("/api") || path.contains('.') {
        return RouteDecision::Pass;
    }
    if LOCALE_PREFIX_RE.is_match(path) {
        return RouteDecision::Pass;
    }
    let locale = detect_locale(accept_language);
    let rest = if path == "/" { "" } else { path };
    RouteDecision::Redirect(format!("/{locale}{rest}"))
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Currency {
    pub code: &'static str,
    pub rate: f64,
}

/// USD amount in the locale's currency, whole units, locale grouping.
pub fn format_price(usd: f64, locale: Locale, rates: &HashMap<String, f64>) -> String {
    let currency = locale.currency(rates);
    let amount = (usd * currency.rate).round() as i64;
    let (prefix, sep) = match locale {
        Locale::Es => ("$", '.'),
        Locale::Pt => ("R$", '.'),
        Locale::En => ("USD", ','),
    };
    let sign = if amount < 0 { "-" } else { "" };
    format!("{sign}{prefix} {}", group_digits(amount.unsigned_abs(), sep))
}

fn group_digits(n: u64, sep: char) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(sep);
        }
        out.push(ch);
    }
    out
}
