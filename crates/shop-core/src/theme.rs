//! Navbar theming as a pure function of the current route and scroll offset.

use serde::Serialize;

/// Scroll offset (px) after which the home navbar turns solid
pub const SOLID_NAVBAR_OFFSET: u32 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogoVariant {
    Light,
    Dark,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThemeTokens {
    pub navbar_background: &'static str,
    pub navbar_text: &'static str,
    pub logo: LogoVariant,
    pub shadow: bool,
}

const TRANSPARENT: ThemeTokens = ThemeTokens {
    navbar_background: "transparent",
    navbar_text: "#ffffff",
    logo: LogoVariant::Light,
    shadow: false,
};

const SOLID: ThemeTokens = ThemeTokens {
    navbar_background: "#ffffff",
    navbar_text: "#111111",
    logo: LogoVariant::Dark,
    shadow: true,
};

const ADMIN: ThemeTokens = ThemeTokens {
    navbar_background: "#111111",
    navbar_text: "#ffffff",
    logo: LogoVariant::Light,
    shadow: true,
};

/// The home hero shows a transparent navbar until the page scrolls past
/// [`SOLID_NAVBAR_OFFSET`]; admin pages are dark; every other page is solid.
pub fn theme_for(route: &str, scroll_offset: u32) -> ThemeTokens {
    let path = route.split(['?', '#']).next().unwrap_or_default();
    let path = path.trim_end_matches('/');

    if path.is_empty() {
        if scroll_offset > SOLID_NAVBAR_OFFSET {
            SOLID
        } else {
            TRANSPARENT
        }
    } else if path == "/admin" || path.starts_with("/admin/") {
        ADMIN
    } else {
        SOLID
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_home_switches_on_scroll() {
        assert_eq!(theme_for("/", 0), TRANSPARENT);
        assert_eq!(theme_for("/", SOLID_NAVBAR_OFFSET), TRANSPARENT);
        assert_eq!(theme_for("/?ref=ig", SOLID_NAVBAR_OFFSET + 1), SOLID);
        assert_eq!(theme_for("", 500), SOLID);
    }

    #[test]
    fn test_other_routes_ignore_scroll() {
        assert_eq!(theme_for("/products/4", 0), SOLID);
        assert_eq!(theme_for("/admin/sales", 0).logo, LogoVariant::Light);
        assert_eq!(theme_for("/administration", 0), SOLID);
    }
}
