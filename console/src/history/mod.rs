// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// Attach sources.
pub mod history_buffer;

// Re-export.
pub use history_buffer::*;
