//! The page handle the step executor drives.
//!
//! [`crate::webdriver::Browser`] is the real implementation; tests use an
//! in-memory page with scripted rendering.

use anyhow::Result;
use async_trait::async_trait;

/// Keys a `key-press` step can send
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Tab,
    Enter,
    Escape,
    Backspace,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Home,
    End,
    Char(char),
}

impl std::str::FromStr for Key {
    type Err = anyhow::Error;

    /// Parse a key name (case-insensitive) or a single character
    fn from_str(s: &str) -> Result<Self> {
        let mut chars = s.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Ok(Key::Char(c));
        }

        match s.to_lowercase().as_str() {
            "tab" => Ok(Key::Tab),
            "enter" | "return" => Ok(Key::Enter),
            "escape" | "esc" => Ok(Key::Escape),
            "backspace" => Ok(Key::Backspace),
            "arrowup" | "up" => Ok(Key::ArrowUp),
            "arrowdown" | "down" => Ok(Key::ArrowDown),
            "arrowleft" | "left" => Ok(Key::ArrowLeft),
            "arrowright" | "right" => Ok(Key::ArrowRight),
            "home" => Ok(Key::Home),
            "end" => Ok(Key::End),
            _ => anyhow::bail!("Unsupported key: {}", s),
        }
    }
}

/// A single browser page, exclusively owned by the run driving it
#[async_trait]
pub trait Page: Send + Sync {
    /// Handle to a resolved element
    type Element: Send + Sync;

    /// Start loading `url`
    async fn goto(&self, url: &str) -> Result<()>;

    /// Whether the current document has finished loading
    async fn is_ready(&self) -> Result<bool>;

    /// First element matching `locator` that is currently visible
    async fn find_visible(&self, locator: &str) -> Result<Option<Self::Element>>;

    async fn scroll_into_view(&self, element: &Self::Element) -> Result<()>;

    async fn click(&self, element: &Self::Element) -> Result<()>;

    /// Replace the element's value with `text`
    async fn fill(&self, element: &Self::Element, text: &str) -> Result<()>;

    /// Send `key` to `target`, or to the focused element when `None`
    async fn press_key(&self, target: Option<&Self::Element>, key: Key) -> Result<()>;

    /// Full-page PNG capture
    async fn screenshot(&self) -> Result<Vec<u8>>;

    /// Serialized DOM
    async fn html(&self) -> Result<String>;

    /// Release the page and its browser session
    async fn close(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_parse() {
        assert_eq!("Tab".parse::<Key>().unwrap(), Key::Tab);
        assert_eq!("ENTER".parse::<Key>().unwrap(), Key::Enter);
        assert_eq!("return".parse::<Key>().unwrap(), Key::Enter);
        assert_eq!("ArrowDown".parse::<Key>().unwrap(), Key::ArrowDown);
        assert_eq!("a".parse::<Key>().unwrap(), Key::Char('a'));
        assert_eq!("/".parse::<Key>().unwrap(), Key::Char('/'));
        assert!("F13".parse::<Key>().is_err());
        assert!("".parse::<Key>().is_err());
    }
}
