//! Display abstraction for the PLC status screen.
//!
//! This module defines the [`StatusDisplay`] trait for the two-line text
//! display refreshed by the PLC supervisor (character LCD, OLED, etc.).

use core::convert::Infallible;

/// Two-line status display.
///
/// # Example
///
/// ```ignore
/// use rs_plc::traits::StatusDisplay;
///
/// struct MyLcd { /* ... */ }
///
/// impl StatusDisplay for MyLcd {
///     type Error = ();
///
///     fn init(&mut self) -> Result<(), ()> { Ok(()) }
///     fn clear(&mut self) -> Result<(), ()> { Ok(()) }
///     fn show_lines(&mut self, line1: &str, line2: &str) -> Result<(), ()> {
///         // Write both rows...
///         Ok(())
///     }
/// }
/// ```
pub trait StatusDisplay {
    /// Error type for display operations.
    type Error: core::fmt::Debug;

    /// Initializes the display hardware. Called once at startup.
    fn init(&mut self) -> Result<(), Self::Error>;

    /// Clears the display.
    fn clear(&mut self) -> Result<(), Self::Error>;

    /// Replaces both rows of text.
    fn show_lines(&mut self, line1: &str, line2: &str) -> Result<(), Self::Error>;
}

/// Placeholder for boards without a status display.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoDisplay;

impl StatusDisplay for NoDisplay {
    type Error = Infallible;

    fn init(&mut self) -> Result<(), Infallible> {
        Ok(())
    }

    fn clear(&mut self) -> Result<(), Infallible> {
        Ok(())
    }

    fn show_lines(&mut self, _line1: &str, _line2: &str) -> Result<(), Infallible> {
        Ok(())
    }
}
