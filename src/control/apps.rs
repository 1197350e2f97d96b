use serde::{Deserialize, Serialize};

/// Maps a display name (often localized) to a package pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppAlias {
    pub name: String,
    pub pattern: String,
    /// Match the whole package name instead of a substring
    #[serde(default)]
    pub exact: bool,
}

impl AppAlias {
    fn substring(name: &str, pattern: &str) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            exact: false,
        }
    }

    fn matches(&self, package: &str) -> bool {
        if self.exact {
            package == self.pattern
        } else {
            package.to_lowercase().contains(&self.pattern.to_lowercase())
        }
    }
}

pub fn default_aliases() -> Vec<AppAlias> {
    vec![
        AppAlias::substring("企业微信", "wework"),
        AppAlias {
            name: "微信".into(),
            pattern: "com.tencent.mm".into(),
            exact: true,
        },
        AppAlias::substring("支付宝", "alipay"),
        AppAlias::substring("淘宝", "taobao"),
        AppAlias::substring("美团", "meituan"),
        AppAlias::substring("饿了么", "eleme"),
    ]
}

const SYSTEM_PREFIXES: [&str; 2] = ["com.android.", "com.google.android."];

/// Drop platform packages, keeping what the user installed.
pub fn user_packages(packages: Vec<String>) -> Vec<String> {
    packages
        .into_iter()
        .filter(|p| !SYSTEM_PREFIXES.iter().any(|prefix| p.starts_with(prefix)))
        .collect()
}

/// Case-insensitive substring search over package names, plus aliases whose
/// name equals the keyword exactly.
pub fn search_packages(packages: &[String], keyword: &str, aliases: &[AppAlias]) -> Vec<String> {
    let needle = keyword.to_lowercase();
    let alias_hits: Vec<&AppAlias> = aliases.iter().filter(|a| a.name == keyword).collect();

    packages
        .iter()
        .filter(|p| p.to_lowercase().contains(&needle) || alias_hits.iter().any(|a| a.matches(p)))
        .cloned()
        .collect()
}
