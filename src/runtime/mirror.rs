//! Runtime mirror of the session state.
//!
//! The mirror is the only session value that exists at execution time. It
//! holds the native window handles in the same order as the abstract state's
//! window list, so indices can be compared one to one.

use crate::core::input::KeyTable;
use crate::core::state::{ActiveState, WindowDesc, DEFAULT_WINDOW};
use crate::core::types::{Attribute, Border, ColorPair, NativeAttr, ResolvedBorder};
use crate::error::ProtocolError;

/// A window as the runtime knows it.
#[derive(Debug, Clone)]
pub struct RuntimeWindow<W> {
    pub desc: WindowDesc,
    /// Border drawn at creation, if any.
    pub border: Option<ResolvedBorder>,
    pub handle: W,
}

#[derive(Debug, Clone)]
pub struct Mirror<W> {
    /// Most recently added first, like the abstract state.
    windows: Vec<RuntimeWindow<W>>,
    current: usize,
    /// Registration order.
    colors: Vec<(String, ColorPair)>,
    keys: KeyTable,
}

impl<W> Mirror<W> {
    /// Mirror of a freshly opened session: only the default window.
    pub fn new(screen: W, keys: KeyTable) -> Self {
        Self {
            windows: vec![RuntimeWindow {
                desc: WindowDesc::new(DEFAULT_WINDOW),
                border: None,
                handle: screen,
            }],
            current: 0,
            colors: Vec::new(),
            keys,
        }
    }

    pub fn windows(&self) -> &[RuntimeWindow<W>] {
        &self.windows
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> &RuntimeWindow<W> {
        &self.windows[self.current]
    }

    pub fn colors(&self) -> &[(String, ColorPair)] {
        &self.colors
    }

    pub fn keys(&self) -> &KeyTable {
        &self.keys
    }

    pub fn find_window(&self, name: &str) -> Option<usize> {
        self.windows.iter().position(|w| w.desc.id == name)
    }

    /// Pair bound to a color name. The latest registration wins.
    pub fn color_pair(&self, name: &str) -> Option<ColorPair> {
        self.colors
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, pair)| *pair)
    }

    pub fn add_window(&mut self, name: &str, border: Option<ResolvedBorder>, handle: W) {
        self.windows.insert(
            0,
            RuntimeWindow {
                desc: WindowDesc::new(name),
                border,
                handle,
            },
        );
        self.current += 1;
    }

    pub fn set_window(&mut self, name: &str) -> Result<(), ProtocolError> {
        self.current = self
            .find_window(name)
            .ok_or_else(|| ProtocolError::UnknownWindow(name.to_string()))?;
        Ok(())
    }

    pub fn unset_window(&mut self) -> Result<(), ProtocolError> {
        self.set_window(DEFAULT_WINDOW)
    }

    pub fn add_color(&mut self, name: &str, pair: ColorPair) {
        self.colors.push((name.to_string(), pair));
    }

    pub fn set_keypad(&mut self, on: bool) {
        self.windows[self.current].desc.keypad = on;
    }

    pub fn set_no_delay(&mut self, on: bool) {
        self.windows[self.current].desc.no_delay = on;
    }

    /// Native form of an attribute, with colors looked up by name.
    pub fn resolve_attr(&self, attr: &Attribute) -> Result<NativeAttr, ProtocolError> {
        if let Some(flags) = attr.flags() {
            return Ok(NativeAttr::Style(flags));
        }
        match attr {
            Attribute::Color(color) => self
                .color_pair(color.name())
                .map(NativeAttr::Pair)
                .ok_or_else(|| ProtocolError::UnknownColor(color.name().to_string())),
            _ => Ok(NativeAttr::Pair(ColorPair::DEFAULT)),
        }
    }

    pub fn resolve_border(&self, border: &Border) -> Result<ResolvedBorder, ProtocolError> {
        let pair = match &border.color {
            Some(color) => Some(
                self.color_pair(color.name())
                    .ok_or_else(|| ProtocolError::UnknownColor(color.name().to_string()))?,
            ),
            None => None,
        };
        Ok(ResolvedBorder {
            glyphs: border.glyphs,
            pair,
        })
    }

    /// Same windows in the same order with the same flags, same current
    /// index, same color names.
    pub fn is_consistent_with(&self, state: &ActiveState) -> bool {
        self.current == state.current_index()
            && self.windows.len() == state.windows().len()
            && self
                .windows
                .iter()
                .zip(state.windows())
                .all(|(runtime, desc)| runtime.desc == *desc)
            && self.colors.len() == state.colors().len()
            && self
                .colors
                .iter()
                .zip(state.colors())
                .all(|((name, _), registered)| name == registered)
    }
}
