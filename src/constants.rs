//! Layout metrics and interaction tuning values
//!
//! Centralized location for all hard-coded values to improve maintainability

/// Node layout constants
pub mod node {
    /// Height of the title bar at the top of every node
    pub const TITLE_HEIGHT: f32 = 30.0;

    /// Height of one port row below the title bar
    pub const PORT_ROW_HEIGHT: f32 = 25.0;

    /// Horizontal inset of an input pin from the node's left edge
    pub const INPUT_PIN_INSET: f32 = 8.0;

    /// Horizontal inset of an output pin from the node's right edge
    pub const OUTPUT_PIN_INSET: f32 = 22.0;

    /// Offset from a pin sprite's top-left corner to its center
    pub const PIN_CENTER_OFFSET: [f32; 2] = [7.5, 5.5];
}

/// Hit-testing constants
pub mod hit {
    /// Padding around hit rectangles, in pixels
    pub const MAX_DISTANCE: f32 = 5.0;

    /// How precisely the user usually positions the mouse; two candidates
    /// closer than this are ranked by area instead of distance
    pub const NOISE_THRESHOLD: f32 = 5.0;

    /// Side length of the square hit box centered on a port pin
    pub const PORT_BOX_SIZE: f32 = 15.0;
}

/// Inline value editor constants
pub mod editor {
    /// Horizontal offset of the editor box from the node's left edge
    pub const BOX_LEFT: f32 = 30.0;

    /// Horizontal space reserved to the right of the editor box
    pub const BOX_RIGHT_MARGIN: f32 = 34.0;

    /// Height of the editor box
    pub const BOX_HEIGHT: f32 = 16.0;
}

/// Preview area constants
pub mod preview {
    /// Height reserved below the port rows for a numeric preview
    pub const NUMBER_HEIGHT: f32 = 30.0;

    /// Height reserved below the port rows for an array plot preview
    pub const PLOT_HEIGHT: f32 = 60.0;
}

/// Add-node menu constants
pub mod menu {
    /// Width of the menu panel
    pub const WIDTH: f32 = 150.0;

    /// Height of one menu row
    pub const ROW_HEIGHT: f32 = 20.0;
}

/// Autosave constants
pub mod autosave {
    /// Minimum interval between two autosaves, in milliseconds
    pub const INTERVAL_MS: u64 = 5000;
}
