// Top-level screen stack. Each shown screen gets a tag and a fresh Lifecycle;
// replacing or popping a screen destroys its Lifecycle, which tears down
// every feature bound to it.

use std::fmt;
use std::sync::Arc;

use crate::error::NavigationError;
use crate::modules::feature::Lifecycle;

pub const BROWSER_TAG: &str = "BROWSER";
pub const TABS_TRAY_TAG: &str = "TABS";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScreenTag(String);

impl ScreenTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScreenTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScreenTag {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenDescriptor {
    Browser { session_id: Option<String> },
    TabsTray,
    Home,
}

impl ScreenDescriptor {
    fn same_kind(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// A "replace top-level screen" request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceRequest {
    pub descriptor: ScreenDescriptor,
    pub tag: ScreenTag,
    /// Record a back entry so a later back() restores the replaced screen.
    pub reversible: bool,
}

impl ReplaceRequest {
    pub fn new(descriptor: ScreenDescriptor, tag: impl Into<ScreenTag>) -> Self {
        Self {
            descriptor,
            tag: tag.into(),
            reversible: true,
        }
    }

    pub fn non_reversible(mut self) -> Self {
        self.reversible = false;
        self
    }
}

pub struct ScreenEntry {
    pub descriptor: ScreenDescriptor,
    pub tag: ScreenTag,
    pub lifecycle: Arc<Lifecycle>,
}

impl ScreenEntry {
    fn open(descriptor: ScreenDescriptor, tag: ScreenTag) -> Self {
        let lifecycle = Lifecycle::new();
        lifecycle.create();
        Self { descriptor, tag, lifecycle }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct BackRecord {
    descriptor: ScreenDescriptor,
    tag: ScreenTag,
}

/// Where a tagged screen currently sits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenLocation {
    Current,
    /// Position in the back stack, 0 being the next screen back() restores.
    BackStack(usize),
}

#[derive(Default)]
pub struct Navigator {
    current: Option<ScreenEntry>,
    back_stack: Vec<BackRecord>,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&ScreenEntry> {
        self.current.as_ref()
    }

    pub fn back_stack_len(&self) -> usize {
        self.back_stack.len()
    }

    pub fn find_by_tag(&self, tag: &str) -> Option<ScreenLocation> {
        if self.current.as_ref().is_some_and(|c| c.tag.as_str() == tag) {
            return Some(ScreenLocation::Current);
        }
        self.back_stack
            .iter()
            .rev()
            .position(|r| r.tag.as_str() == tag)
            .map(ScreenLocation::BackStack)
    }

    /// Replaces the current screen (if any) with `request`'s screen and
    /// returns the new screen's lifecycle.
    ///
    /// A tag names at most one screen in the stack. Showing a tag that is
    /// already current replaces that screen in place; showing one that sits
    /// in the back stack unwinds the stack down to below it first.
    pub fn replace(&mut self, request: ReplaceRequest) -> Result<Arc<Lifecycle>, NavigationError> {
        self.check_tag(&request.tag, &request.descriptor)?;

        if let Some(position) = self.back_stack.iter().position(|r| r.tag == request.tag) {
            log::debug!(
                "[Navigator] Unwinding {} back records above {}",
                self.back_stack.len() - position,
                request.tag
            );
            self.back_stack.truncate(position);
        }

        if let Some(previous) = self.current.take() {
            if request.reversible && previous.tag != request.tag {
                self.back_stack.push(BackRecord {
                    descriptor: previous.descriptor.clone(),
                    tag: previous.tag.clone(),
                });
            }
            previous.lifecycle.destroy();
            log::info!("[Navigator] Replaced {} with {}", previous.tag, request.tag);
        } else {
            log::info!("[Navigator] Showing {}", request.tag);
        }

        let entry = ScreenEntry::open(request.descriptor, request.tag);
        let lifecycle = entry.lifecycle.clone();
        self.current = Some(entry);
        Ok(lifecycle)
    }

    /// Restores the previous screen, destroying the current one. Returns the
    /// restored screen's fresh lifecycle, or None when there is nothing to
    /// go back to.
    pub fn back(&mut self) -> Option<Arc<Lifecycle>> {
        let record = self.back_stack.pop()?;
        if let Some(current) = self.current.take() {
            current.lifecycle.destroy();
            log::info!("[Navigator] Back from {} to {}", current.tag, record.tag);
        }

        let entry = ScreenEntry::open(record.descriptor, record.tag);
        let lifecycle = entry.lifecycle.clone();
        self.current = Some(entry);
        Some(lifecycle)
    }

    fn check_tag(&self, tag: &ScreenTag, descriptor: &ScreenDescriptor) -> Result<(), NavigationError> {
        let conflict = self
            .current
            .iter()
            .map(|c| (&c.tag, &c.descriptor))
            .chain(self.back_stack.iter().map(|r| (&r.tag, &r.descriptor)))
            .any(|(t, d)| t == tag && !d.same_kind(descriptor));

        if conflict {
            return Err(NavigationError::TagConflict {
                tag: tag.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn browser(session_id: Option<&str>) -> ScreenDescriptor {
        ScreenDescriptor::Browser {
            session_id: session_id.map(str::to_string),
        }
    }

    #[test]
    fn test_replace_and_back_restore_prior_screen() {
        let mut navigator = Navigator::new();
        let browser_lifecycle = navigator
            .replace(ReplaceRequest::new(browser(Some("abc")), BROWSER_TAG))
            .unwrap();

        navigator
            .replace(ReplaceRequest::new(ScreenDescriptor::TabsTray, TABS_TRAY_TAG))
            .unwrap();
        assert!(browser_lifecycle.is_destroyed());
        assert_eq!(navigator.current().unwrap().tag.as_str(), TABS_TRAY_TAG);
        assert_eq!(navigator.find_by_tag(BROWSER_TAG), Some(ScreenLocation::BackStack(0)));

        let restored = navigator.back().unwrap();
        assert!(!restored.is_destroyed());
        let current = navigator.current().unwrap();
        assert_eq!(current.tag.as_str(), BROWSER_TAG);
        assert_eq!(current.descriptor, browser(Some("abc")));
        assert!(navigator.find_by_tag(TABS_TRAY_TAG).is_none());
        assert!(navigator.back().is_none());
    }

    #[test]
    fn test_non_reversible_replace_leaves_no_back_record() {
        let mut navigator = Navigator::new();
        navigator.replace(ReplaceRequest::new(ScreenDescriptor::Home, "HOME")).unwrap();
        navigator
            .replace(ReplaceRequest::new(browser(None), BROWSER_TAG).non_reversible())
            .unwrap();

        assert_eq!(navigator.back_stack_len(), 0);
        assert!(navigator.back().is_none());
        assert_eq!(navigator.find_by_tag(BROWSER_TAG), Some(ScreenLocation::Current));
    }

    #[test]
    fn test_tag_cannot_name_another_kind_of_screen() {
        let mut navigator = Navigator::new();
        navigator.replace(ReplaceRequest::new(browser(None), BROWSER_TAG)).unwrap();

        let err = navigator
            .replace(ReplaceRequest::new(ScreenDescriptor::TabsTray, BROWSER_TAG))
            .unwrap_err();
        assert_eq!(err, NavigationError::TagConflict { tag: BROWSER_TAG.into() });
        // Failed request leaves the stack alone
        assert_eq!(navigator.current().unwrap().descriptor, browser(None));

        // Same kind may reuse its tag, replacing the screen in place
        navigator
            .replace(ReplaceRequest::new(ScreenDescriptor::TabsTray, TABS_TRAY_TAG))
            .unwrap();
        navigator
            .replace(ReplaceRequest::new(ScreenDescriptor::TabsTray, TABS_TRAY_TAG))
            .unwrap();
        assert_eq!(navigator.back_stack_len(), 1);
        assert_eq!(navigator.find_by_tag(TABS_TRAY_TAG), Some(ScreenLocation::Current));
    }

    #[test]
    fn test_tag_stays_unique_across_the_stack() {
        let mut navigator = Navigator::new();
        let browser_lifecycle = navigator.replace(ReplaceRequest::new(browser(Some("a")), BROWSER_TAG)).unwrap();
        navigator.replace(ReplaceRequest::new(ScreenDescriptor::Home, "HOME")).unwrap();
        navigator
            .replace(ReplaceRequest::new(ScreenDescriptor::TabsTray, TABS_TRAY_TAG))
            .unwrap();
        assert_eq!(navigator.back_stack_len(), 2);

        // Re-showing the browser drops its older record and everything above it
        navigator.replace(ReplaceRequest::new(browser(Some("b")), BROWSER_TAG)).unwrap();
        assert!(browser_lifecycle.is_destroyed());
        assert_eq!(navigator.find_by_tag(BROWSER_TAG), Some(ScreenLocation::Current));
        assert_eq!(navigator.back_stack_len(), 1);
        assert_eq!(navigator.find_by_tag(TABS_TRAY_TAG), Some(ScreenLocation::BackStack(0)));
        assert!(navigator.find_by_tag("HOME").is_none());

        // Re-showing the current screen leaves no record of itself
        navigator.replace(ReplaceRequest::new(browser(Some("c")), BROWSER_TAG)).unwrap();
        assert_eq!(navigator.back_stack_len(), 1);
        navigator.back().unwrap();
        assert_eq!(navigator.current().unwrap().tag.as_str(), TABS_TRAY_TAG);
        assert!(navigator.back().is_none());
    }
}
