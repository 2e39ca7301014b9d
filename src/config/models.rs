use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root automation script.
///
/// This structure is intended to be deserialized from a JSON script file.
/// It captures everything a run needs:
/// - `settings`: run-wide knobs (default post-action delay, error screenshots,
///   the global runtime budget)
/// - `actions`: the top-level action sequence, executed strictly in order
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct Script {
    /// Run-wide settings. Every field has a default, so the block is optional.
    #[serde(default)]
    pub settings: Settings,

    /// Top-level actions, executed sequentially.
    #[serde(default)]
    pub actions: Vec<ActionNode>,
}

/// Run-wide settings block.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Delay in seconds applied after every action that does not carry its
    /// own `wait` (default: 0).
    pub default_wait: f64,

    /// Capture a screenshot when an action fails (default: true).
    pub screenshot_on_error: bool,

    /// Hard ceiling on total run duration in seconds (default: 3600).
    /// Zero disables the budget.
    pub max_runtime: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_wait: 0.0,
            screenshot_on_error: true,
            max_runtime: 3600.0,
        }
    }
}

/// One node of the action tree: the action itself plus the per-node
/// attributes every kind shares.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ActionNode {
    /// The action to perform. The `type` tag selects the kind.
    #[serde(flatten)]
    pub kind: ActionKind,

    /// Post-action delay in seconds. Overrides `settings.default_wait`
    /// for this node, including an explicit `0` to suppress it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait: Option<f64>,

    /// Free-form annotation carried through logs and the run history.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl ActionNode {
    /// Node with no post-delay override and no comment.
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            wait: None,
            comment: None,
        }
    }
}

/// Action definition.
///
/// Use `type` to select a variant. Position-bearing actions embed a
/// [`Target`] at the top level of the node, so `{"type": "click",
/// "coordinate": "ok_button"}` and `{"type": "click", "x": 10, "y": 20,
/// "relative_to": "window"}` are both valid nodes.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    // --- Pointer ---
    /// Single left click at the resolved position.
    Click {
        #[serde(flatten)]
        target: Target,
    },

    /// Double left click at the resolved position.
    DoubleClick {
        #[serde(flatten)]
        target: Target,
    },

    /// Single right click at the resolved position.
    RightClick {
        #[serde(flatten)]
        target: Target,
    },

    /// Press-move-release between two independently resolved positions.
    Drag {
        /// Where the drag begins.
        start: Target,
        /// Where the drag ends.
        end: Target,
        /// Total movement time in seconds (default: 1.0).
        #[serde(default = "default_drag_duration")]
        duration: f64,
        /// Button held for the drag (default: left).
        #[serde(default)]
        button: MouseButton,
    },

    /// Scroll the mouse wheel. With a position the pointer moves there
    /// first; without one it scrolls wherever the pointer currently is.
    /// Positive values scroll down, negative up.
    Scroll {
        /// Number of wheel clicks (default: 1).
        #[serde(default = "default_scroll_clicks")]
        clicks: i32,
        #[serde(flatten)]
        target: Target,
    },

    // --- Keyboard ---
    /// Type literal text (handles unicode).
    TypeText {
        text: String,
        /// Pause between characters in seconds (default: 0, one burst).
        #[serde(default)]
        interval: f64,
    },

    /// Press a key combination, e.g. `["ctrl", "shift", "t"]`. All keys
    /// but the last are held as modifiers while the last is tapped.
    Hotkey { keys: Vec<String> },

    // --- Timing & Waits ---
    /// Pause for a fixed number of seconds.
    WaitFixed {
        /// Duration in seconds (default: 1).
        #[serde(default = "default_wait_seconds")]
        seconds: f64,
    },

    /// Poll a condition until it holds or the timeout elapses. A timeout
    /// is logged but does not fail the run.
    WaitForCondition {
        condition: Condition,
        /// Polling window in seconds (default: 10).
        #[serde(default = "default_condition_timeout")]
        timeout: f64,
    },

    /// Poll until a window whose title or application name matches
    /// appears. A timeout is logged but does not fail the run.
    WaitForWindow {
        window_name: String,
        /// Polling window in seconds (default: 10).
        #[serde(default = "default_condition_timeout")]
        timeout: f64,
    },

    // --- Diagnostics ---
    /// Capture the full display to a file. Without a filename a
    /// timestamped one is generated.
    Screenshot {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filename: Option<String>,
    },

    /// Emit a message into the run log.
    Log {
        #[serde(default)]
        message: String,
    },

    // --- Control Flow ---
    /// Run the body a bounded number of times.
    #[serde(rename = "loop")]
    Repeat {
        /// Iteration bound (default: 10).
        #[serde(default = "default_max_iterations")]
        max_iterations: u32,
        #[serde(default)]
        actions: Vec<ActionNode>,
    },

    /// Run the body until the condition holds or the timeout elapses.
    /// The condition is probed before every pass.
    LoopUntil {
        condition: Condition,
        /// Overall bound in seconds (default: 30).
        #[serde(default = "default_loop_timeout")]
        timeout: f64,
        #[serde(default)]
        actions: Vec<ActionNode>,
    },

    /// Probe the condition once (short window), then run exactly one of
    /// the two branches.
    Conditional {
        condition: Condition,
        #[serde(default)]
        if_true: Vec<ActionNode>,
        #[serde(default)]
        if_false: Vec<ActionNode>,
    },

    /// Stop the entire run with the given code when the condition holds.
    ExitIf {
        condition: Condition,
        /// Process exit code (default: 0).
        #[serde(default)]
        exit_code: i32,
        /// Message reported when the exit fires.
        #[serde(default = "default_exit_message")]
        message: String,
    },

    // --- Screen-Driven ---
    /// Scan the screen (or a region) row by row for the first pixel
    /// within tolerance of `color` and left-click it. No match is a
    /// logged no-op, not a failure.
    ClickOnColor {
        /// Expected color as `[r, g, b]`.
        color: Rgb,
        /// Per-channel tolerance (default: 10).
        #[serde(default = "default_tolerance")]
        tolerance: u8,
        /// Region to scan; the full display when omitted.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        search_region: Option<Rect>,
    },
}

impl ActionKind {
    /// Every kind tag the engine understands, as it appears in scripts.
    pub const KNOWN: &'static [&'static str] = &[
        "click",
        "double_click",
        "right_click",
        "drag",
        "scroll",
        "type_text",
        "hotkey",
        "wait_fixed",
        "wait_for_condition",
        "wait_for_window",
        "screenshot",
        "log",
        "loop",
        "loop_until",
        "conditional",
        "exit_if",
        "click_on_color",
    ];

    /// The kind tag, as it appears in scripts.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Click { .. } => "click",
            Self::DoubleClick { .. } => "double_click",
            Self::RightClick { .. } => "right_click",
            Self::Drag { .. } => "drag",
            Self::Scroll { .. } => "scroll",
            Self::TypeText { .. } => "type_text",
            Self::Hotkey { .. } => "hotkey",
            Self::WaitFixed { .. } => "wait_fixed",
            Self::WaitForCondition { .. } => "wait_for_condition",
            Self::WaitForWindow { .. } => "wait_for_window",
            Self::Screenshot { .. } => "screenshot",
            Self::Log { .. } => "log",
            Self::Repeat { .. } => "loop",
            Self::LoopUntil { .. } => "loop_until",
            Self::Conditional { .. } => "conditional",
            Self::ExitIf { .. } => "exit_if",
            Self::ClickOnColor { .. } => "click_on_color",
        }
    }
}

/// Where a position-bearing action or condition points.
///
/// Either a named coordinate looked up in the coordinate namespace, or a
/// literal `x`/`y` pair (missing components default to 0). Literal pairs
/// may be window-relative via `relative_to`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Target {
    /// Name of a recorded coordinate. Takes precedence over `x`/`y`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinate: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<i32>,

    /// Space the literal pair lives in (default: screen).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_to: Option<Space>,
}

impl Target {
    /// Target a named coordinate.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            coordinate: Some(name.into()),
            ..Self::default()
        }
    }

    /// Target a literal screen position.
    pub fn at(x: i32, y: i32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }

    /// Target a literal position relative to the bound window's origin.
    pub fn at_window(x: i32, y: i32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            relative_to: Some(Space::Window),
            ..Self::default()
        }
    }

    /// True when the node carries no position at all.
    pub fn is_empty(&self) -> bool {
        self.coordinate.is_none() && self.x.is_none() && self.y.is_none()
    }
}

/// Coordinate space for literal positions.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Space {
    /// Offset from the bound window's top-left corner.
    Window,
    /// Absolute screen position.
    Screen,
}

/// Boolean predicate over observable desktop state.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// The pixel at the resolved position matches `color` within a
    /// per-channel tolerance.
    ColorMatch {
        #[serde(flatten)]
        target: Target,
        /// Expected color as `[r, g, b]`.
        color: Rgb,
        /// Per-channel tolerance (default: 10).
        #[serde(default = "default_tolerance")]
        tolerance: u8,
    },

    /// A window whose title or application name matches exists.
    WindowExists { window_name: String },

    /// The enclosing wait has been polling for at least this long.
    TimeElapsed { seconds: f64 },
}

/// RGB triple, serialized as `[r, g, b]`.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Per-channel comparison: every channel within `tolerance` of the
    /// expected value.
    pub fn matches(self, expected: Rgb, tolerance: u8) -> bool {
        let t = i16::from(tolerance);
        (i16::from(self.0) - i16::from(expected.0)).abs() <= t
            && (i16::from(self.1) - i16::from(expected.1)).abs() <= t
            && (i16::from(self.2) - i16::from(expected.2)).abs() <= t
    }
}

/// A rectangle region on screen.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Mouse button enumeration.
#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    #[default]
    Left,
    Middle,
    Right,
}

/// Coordinate document produced by a recording session.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CoordinateDoc {
    /// The recorded points, in recording order.
    #[serde(default)]
    pub recorded_points: Vec<CoordinateEntry>,

    /// Window the session was recorded against, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_name: Option<String>,

    /// When the session happened (RFC 3339).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<String>,
}

impl CoordinateDoc {
    /// Flatten the point list into a lookup namespace. Later entries win
    /// on duplicate names.
    pub fn into_namespace(self) -> Namespace {
        self.recorded_points
            .into_iter()
            .map(|entry| (entry.name.clone(), entry))
            .collect()
    }
}

/// Name -> recorded point, as the resolver sees it.
pub type Namespace = HashMap<String, CoordinateEntry>;

/// One named point from a coordinate document.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct CoordinateEntry {
    pub name: String,

    /// Recorded x. Window-relative when `window_relative` is set.
    pub x: i32,

    /// Recorded y. Window-relative when `window_relative` is set.
    pub y: i32,

    /// Whether `x`/`y` are offsets from the recorded window's origin.
    #[serde(default)]
    pub window_relative: bool,

    /// Pixel color sampled at recording time; informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Rgb>,

    /// Absolute position at recording time; informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absolute_x: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absolute_y: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Starter script shapes `generate` can emit from a coordinate document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    /// One click per recorded point, in order.
    Basic,
    /// A bounded loop clicking the first recorded point.
    Loop,
    /// A color wait on the first recorded point.
    Conditional,
}

impl Script {
    /// Build a starter script from a coordinate document.
    pub fn template(kind: TemplateKind, doc: &CoordinateDoc) -> Self {
        let settings = Settings {
            default_wait: 0.5,
            screenshot_on_error: true,
            max_runtime: 3600.0,
        };

        let actions = match kind {
            TemplateKind::Basic => doc
                .recorded_points
                .iter()
                .map(|point| {
                    let position = match point.color {
                        Some(Rgb(r, g, b)) => format!(
                            "Coordinates: ({}, {}) - Color: RGB({r}, {g}, {b})",
                            point.x, point.y
                        ),
                        None => format!("Coordinates: ({}, {})", point.x, point.y),
                    };
                    ActionNode {
                        kind: ActionKind::Click {
                            target: Target::named(&point.name),
                        },
                        wait: Some(1.0),
                        comment: Some(position),
                    }
                })
                .collect(),

            TemplateKind::Loop => {
                let name = doc
                    .recorded_points
                    .first()
                    .map_or("point_1", |point| point.name.as_str());
                vec![ActionNode::new(ActionKind::Repeat {
                    max_iterations: 10,
                    actions: vec![ActionNode {
                        kind: ActionKind::Click {
                            target: Target::named(name),
                        },
                        wait: Some(1.0),
                        comment: None,
                    }],
                })]
            }

            TemplateKind::Conditional => doc
                .recorded_points
                .first()
                .map(|point| {
                    ActionNode::new(ActionKind::WaitForCondition {
                        condition: Condition::ColorMatch {
                            target: Target::named(&point.name),
                            color: point.color.unwrap_or(Rgb(0, 0, 0)),
                            tolerance: 10,
                        },
                        timeout: 5.0,
                    })
                })
                .into_iter()
                .collect(),
        };

        Self { settings, actions }
    }
}

fn default_drag_duration() -> f64 {
    1.0
}

fn default_scroll_clicks() -> i32 {
    1
}

fn default_wait_seconds() -> f64 {
    1.0
}

fn default_condition_timeout() -> f64 {
    10.0
}

fn default_loop_timeout() -> f64 {
    30.0
}

fn default_max_iterations() -> u32 {
    10
}

fn default_tolerance() -> u8 {
    10
}

fn default_exit_message() -> String {
    "Exit condition met".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn click_node_parses_named_coordinate() {
        let node: ActionNode = serde_json::from_str(
            r#"{"type": "click", "coordinate": "ok_button", "wait": 0.5, "comment": "confirm"}"#,
        )
        .unwrap();

        assert_eq!(
            node.kind,
            ActionKind::Click {
                target: Target::named("ok_button"),
            }
        );
        assert_eq!(node.wait, Some(0.5));
        assert_eq!(node.comment.as_deref(), Some("confirm"));
    }

    #[test]
    fn click_node_parses_window_relative_literals() {
        let node: ActionNode = serde_json::from_str(
            r#"{"type": "click", "x": 40, "y": 60, "relative_to": "window"}"#,
        )
        .unwrap();

        assert_eq!(
            node.kind,
            ActionKind::Click {
                target: Target::at_window(40, 60),
            }
        );
        assert_eq!(node.wait, None);
    }

    #[test]
    fn whole_nodes_compare_through_nested_bodies() {
        let tree = || {
            ActionNode::new(ActionKind::Repeat {
                max_iterations: 2,
                actions: vec![ActionNode::new(ActionKind::Log {
                    message: "tick".into(),
                })],
            })
        };

        assert_eq!(tree(), tree());

        let mut other = tree();
        other.wait = Some(0.1);
        assert_ne!(tree(), other);
    }

    #[test]
    fn loop_tag_maps_to_repeat_with_defaults() {
        let node: ActionNode = serde_json::from_str(
            r#"{"type": "loop", "actions": [{"type": "log", "message": "tick"}]}"#,
        )
        .unwrap();

        match node.kind {
            ActionKind::Repeat {
                max_iterations,
                ref actions,
            } => {
                assert_eq!(max_iterations, 10);
                assert_eq!(actions.len(), 1);
            }
            ref other => panic!("expected loop, got {}", other.name()),
        }
    }

    #[test]
    fn condition_flattens_target_and_defaults_tolerance() {
        let condition: Condition = serde_json::from_str(
            r#"{"type": "color_match", "coordinate": "status_led", "color": [0, 200, 0]}"#,
        )
        .unwrap();

        assert_eq!(
            condition,
            Condition::ColorMatch {
                target: Target::named("status_led"),
                color: Rgb(0, 200, 0),
                tolerance: 10,
            }
        );
    }

    #[test]
    fn exit_if_defaults() {
        let node: ActionNode = serde_json::from_str(
            r#"{"type": "exit_if", "condition": {"type": "time_elapsed", "seconds": 0}}"#,
        )
        .unwrap();

        match node.kind {
            ActionKind::ExitIf {
                exit_code,
                ref message,
                ..
            } => {
                assert_eq!(exit_code, 0);
                assert_eq!(message, "Exit condition met");
            }
            ref other => panic!("expected exit_if, got {}", other.name()),
        }
    }

    #[test]
    fn drag_resolves_both_ends_independently() {
        let node: ActionNode = serde_json::from_str(
            r#"{
                "type": "drag",
                "start": {"coordinate": "slider"},
                "end": {"x": 300, "y": 120, "relative_to": "window"},
                "duration": 0.4
            }"#,
        )
        .unwrap();

        match node.kind {
            ActionKind::Drag {
                ref start,
                ref end,
                duration,
                button,
            } => {
                assert_eq!(*start, Target::named("slider"));
                assert_eq!(*end, Target::at_window(300, 120));
                assert!((duration - 0.4).abs() < f64::EPSILON);
                assert_eq!(button, MouseButton::Left);
            }
            ref other => panic!("expected drag, got {}", other.name()),
        }
    }

    #[test]
    fn serialization_round_trips_through_the_type_tag() {
        let node = ActionNode {
            kind: ActionKind::Scroll {
                clicks: -3,
                target: Target::at(500, 400),
            },
            wait: Some(0.0),
            comment: None,
        };

        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "scroll");
        assert_eq!(json["clicks"], -3);
        assert_eq!(json["x"], 500);

        let back: ActionNode = serde_json::from_value(json).unwrap();
        assert_eq!(back.kind, node.kind);
        assert_eq!(back.wait, Some(0.0));
    }

    #[test]
    fn every_kind_name_is_listed_as_known() {
        let node = ActionNode::new(ActionKind::Log {
            message: String::new(),
        });
        assert!(ActionKind::KNOWN.contains(&node.kind.name()));
        assert_eq!(ActionKind::KNOWN.len(), 17);
    }

    #[test]
    fn rgb_matches_within_tolerance_only() {
        let expected = Rgb(100, 150, 200);
        assert!(Rgb(105, 145, 210).matches(expected, 10));
        assert!(!Rgb(111, 150, 200).matches(expected, 10));
        assert!(Rgb(0, 0, 0).matches(Rgb(255, 255, 255), 255));
    }

    #[test]
    fn settings_default_matches_documented_values() {
        let settings = Settings::default();
        assert_eq!(settings.default_wait, 0.0);
        assert!(settings.screenshot_on_error);
        assert_eq!(settings.max_runtime, 3600.0);
    }

    #[test]
    fn namespace_keeps_last_duplicate() {
        let doc = CoordinateDoc {
            recorded_points: vec![
                CoordinateEntry {
                    name: "a".into(),
                    x: 1,
                    y: 1,
                    window_relative: false,
                    color: None,
                    absolute_x: None,
                    absolute_y: None,
                    timestamp: None,
                },
                CoordinateEntry {
                    name: "a".into(),
                    x: 9,
                    y: 9,
                    window_relative: true,
                    color: None,
                    absolute_x: None,
                    absolute_y: None,
                    timestamp: None,
                },
            ],
            window_name: None,
            recorded_at: None,
        };

        let namespace = doc.into_namespace();
        assert_eq!(namespace.len(), 1);
        assert_eq!(namespace["a"].x, 9);
        assert!(namespace["a"].window_relative);
    }

    #[test]
    fn basic_template_clicks_every_point() {
        let doc = CoordinateDoc {
            recorded_points: vec![CoordinateEntry {
                name: "start".into(),
                x: 10,
                y: 20,
                window_relative: true,
                color: Some(Rgb(1, 2, 3)),
                absolute_x: None,
                absolute_y: None,
                timestamp: None,
            }],
            window_name: Some("Editor".into()),
            recorded_at: None,
        };

        let script = Script::template(TemplateKind::Basic, &doc);
        assert_eq!(script.settings.default_wait, 0.5);
        assert_eq!(script.actions.len(), 1);
        assert_eq!(
            script.actions[0].kind,
            ActionKind::Click {
                target: Target::named("start"),
            }
        );
        assert_eq!(script.actions[0].wait, Some(1.0));
        let comment = script.actions[0].comment.as_deref().unwrap();
        assert!(comment.contains("(10, 20)"));
        assert!(comment.contains("RGB(1, 2, 3)"));
    }

    #[test]
    fn loop_template_survives_an_empty_document() {
        let script = Script::template(TemplateKind::Loop, &CoordinateDoc::default());
        match &script.actions[0].kind {
            ActionKind::Repeat { actions, .. } => match &actions[0].kind {
                ActionKind::Click { target } => {
                    assert_eq!(target.coordinate.as_deref(), Some("point_1"));
                }
                other => panic!("expected click, got {}", other.name()),
            },
            other => panic!("expected loop, got {}", other.name()),
        }
    }

    #[test]
    fn conditional_template_is_empty_without_points() {
        let script = Script::template(TemplateKind::Conditional, &CoordinateDoc::default());
        assert!(script.actions.is_empty());
    }
}
