// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// Attach sources.
pub mod console_state;
pub mod edit_intent;
pub mod line_discipline_impl;
pub mod transcript;

// Re-export.
pub use console_state::*;
pub use edit_intent::*;
pub use line_discipline_impl::*;
pub use transcript::*;
