//! Cards and their content variants.
//!
//! A card is a positioned rectangle on a page carrying one [`CardContent`]
//! variant. Cards serialize to a flat field-keyed [`Record`], which is the
//! shape used both by project files and by undo snapshots.

use crate::error::Result;
use crate::geometry::Rect;
use crate::page::PageId;
use serde::{Deserialize, Serialize};

/// Unique identifier for cards within a project.
pub type CardId = u64;

/// Flat field-keyed record produced by [`Card::to_record`].
pub type Record = serde_json::Map<String, serde_json::Value>;

/// The kinds of content a card can hold, without their data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardKind {
    /// A task that is done or not done
    Checkbox,
    /// A task with a numeric progress counter
    Numbered,
    /// Free-form text
    Note,
    /// An image file reference
    Image,
    /// A sound file reference
    Sound,
    /// A countdown timer
    Timer,
    /// A link to a nested page
    Subpage,
}

impl CardKind {
    /// Every kind, in menu order.
    pub const ALL: [CardKind; 7] = [
        CardKind::Checkbox,
        CardKind::Numbered,
        CardKind::Note,
        CardKind::Image,
        CardKind::Sound,
        CardKind::Timer,
        CardKind::Subpage,
    ];

    /// Human-readable name used in menus.
    pub fn label(&self) -> &'static str {
        match self {
            CardKind::Checkbox => "Checkbox",
            CardKind::Numbered => "Number",
            CardKind::Note => "Note",
            CardKind::Image => "Image",
            CardKind::Sound => "Sound",
            CardKind::Timer => "Timer",
            CardKind::Subpage => "Sub-Page",
        }
    }
}

/// Card payload, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "content_type")]
pub enum CardContent {
    /// A task that is done or not done
    Checkbox {
        /// Task text
        description: String,
        /// Whether the task is done
        checked: bool,
    },
    /// A task with a progress counter; complete once `current` reaches `max`
    Numbered {
        /// Task text
        description: String,
        /// Progress so far
        current: u32,
        /// Progress target
        max: u32,
    },
    /// Free-form text
    Note {
        /// Note body
        text: String,
    },
    /// An image file reference; the image itself is never decoded here
    Image {
        /// Path to the image file, if one was chosen
        path: Option<String>,
        /// Displayed size in world units
        display_size: (f32, f32),
    },
    /// A sound file reference; playback is handled elsewhere
    Sound {
        /// Path to the sound file, if one was chosen
        path: Option<String>,
    },
    /// A countdown timer
    Timer {
        /// Timer label
        name: String,
        /// Minutes component of the duration
        minutes: u32,
        /// Seconds component of the duration
        seconds: u32,
        /// Seconds elapsed so far
        #[serde(default)]
        elapsed: f32,
        /// Whether the timer is counting
        #[serde(default)]
        running: bool,
    },
    /// A link to a nested page
    Subpage {
        /// The page this card opens
        target: PageId,
        /// Display name
        name: String,
    },
}

impl CardContent {
    /// Fresh content of the given kind. Sub-pages need the id of the page they
    /// link to, so they are built with [`CardContent::subpage`] instead.
    pub fn new(kind: CardKind) -> Self {
        match kind {
            CardKind::Checkbox => CardContent::Checkbox {
                description: "New Task".to_string(),
                checked: false,
            },
            CardKind::Numbered => CardContent::Numbered {
                description: "New Task".to_string(),
                current: 0,
                max: 10,
            },
            CardKind::Note => CardContent::Note {
                text: "New Note".to_string(),
            },
            CardKind::Image => CardContent::Image {
                path: None,
                display_size: (0.0, 0.0),
            },
            CardKind::Sound => CardContent::Sound { path: None },
            CardKind::Timer => CardContent::Timer {
                name: "New Timer".to_string(),
                minutes: 5,
                seconds: 0,
                elapsed: 0.0,
                running: false,
            },
            CardKind::Subpage => CardContent::subpage(0, "New Sub-Page"),
        }
    }

    /// Content linking to `target`.
    pub fn subpage(target: PageId, name: &str) -> Self {
        CardContent::Subpage {
            target,
            name: name.to_string(),
        }
    }

    /// The kind tag of this content.
    pub fn kind(&self) -> CardKind {
        match self {
            CardContent::Checkbox { .. } => CardKind::Checkbox,
            CardContent::Numbered { .. } => CardKind::Numbered,
            CardContent::Note { .. } => CardKind::Note,
            CardContent::Image { .. } => CardKind::Image,
            CardContent::Sound { .. } => CardKind::Sound,
            CardContent::Timer { .. } => CardKind::Timer,
            CardContent::Subpage { .. } => CardKind::Subpage,
        }
    }

    /// Whether the content tracks completion at all.
    pub fn is_completable(&self) -> bool {
        matches!(
            self,
            CardContent::Checkbox { .. } | CardContent::Numbered { .. }
        )
    }

    /// Whether the content counts as done.
    pub fn is_complete(&self) -> bool {
        match self {
            CardContent::Checkbox { checked, .. } => *checked,
            CardContent::Numbered { current, max, .. } => *max > 0 && current >= max,
            CardContent::Timer {
                minutes,
                seconds,
                elapsed,
                ..
            } => {
                let total = timer_seconds(*minutes, *seconds);
                total > 0.0 && f64::from(*elapsed) >= total
            }
            _ => false,
        }
    }

    /// Whether box selection may pick this card up.
    pub fn is_selectable(&self) -> bool {
        true
    }

    /// Whether the card participates in vertical numbering chains.
    pub fn can_have_neighbors(&self) -> bool {
        !matches!(self, CardContent::Image { .. } | CardContent::Note { .. })
    }

    /// Flips completion for completable content and starts or pauses timers.
    pub fn toggle_completion(&mut self) {
        match self {
            CardContent::Checkbox { checked, .. } => *checked = !*checked,
            CardContent::Numbered { current, max, .. } => {
                *current = if *current >= *max { 0 } else { *max };
            }
            CardContent::Timer { running, .. } => *running = !*running,
            _ => {}
        }
    }

    /// Advances a running timer by `dt` seconds. Returns true when this call
    /// made the timer finish.
    pub fn tick(&mut self, dt: f32) -> bool {
        if let CardContent::Timer {
            minutes,
            seconds,
            elapsed,
            running,
            ..
        } = self
        {
            if !*running {
                return false;
            }
            let total = timer_seconds(*minutes, *seconds);
            *elapsed = f64::from(*elapsed + dt).min(total) as f32;
            if f64::from(*elapsed) >= total {
                *running = false;
                return true;
            }
        }
        false
    }

    /// Main text shown on the card face.
    pub fn title(&self) -> String {
        match self {
            CardContent::Checkbox { description, .. } => first_line(description),
            CardContent::Numbered {
                description,
                current,
                max,
            } => format!("{} ({}/{})", first_line(description), current, max),
            CardContent::Note { text } => text.clone(),
            CardContent::Image { path, .. } | CardContent::Sound { path } => path
                .as_deref()
                .map(file_name)
                .unwrap_or_else(|| "[No file]".to_string()),
            CardContent::Timer {
                name,
                minutes,
                seconds,
                elapsed,
                ..
            } => {
                let remaining =
                    (timer_seconds(*minutes, *seconds) - f64::from(*elapsed)).max(0.0) as u64;
                format!("{}: {:02}:{:02}", name, remaining / 60, remaining % 60)
            }
            CardContent::Subpage { name, .. } => name.clone(),
        }
    }
}

/// Full duration of a timer in seconds. Computed in 64 bits so that any
/// stored `minutes` value fits.
fn timer_seconds(minutes: u32, seconds: u32) -> f64 {
    (u64::from(minutes) * 60 + u64::from(seconds)) as f64
}

fn first_line(text: &str) -> String {
    match text.split_once('\n') {
        Some((head, _)) => format!("{head}[...]"),
        None => text.to_string(),
    }
}

fn file_name(path: &str) -> String {
    std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

/// A positioned content unit placed on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    /// Unique identifier for this card
    pub id: CardId,
    /// The page that owns this card
    pub page: PageId,
    /// World-space rectangle
    pub rect: Rect,
    /// Content payload
    #[serde(flatten)]
    pub content: CardContent,
    /// Numbering prefix derived from neighbor chains; recomputed, never stored
    #[serde(skip)]
    pub numbering: Option<Vec<u32>>,
}

impl Card {
    /// Creates a card with the given id, page, rectangle and content.
    pub fn new(id: CardId, page: PageId, rect: Rect, content: CardContent) -> Self {
        Self {
            id,
            page,
            rect,
            content,
            numbering: None,
        }
    }

    /// Serializes the card into a flat field-keyed record.
    pub fn to_record(&self) -> Result<Record> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => Ok(map),
            other => Err(<serde_json::Error as serde::ser::Error>::custom(format!(
                "card serialized to non-object value {other}"
            ))
            .into()),
        }
    }

    /// Rebuilds a card from a record produced by [`Card::to_record`].
    pub fn from_record(record: &Record) -> Result<Self> {
        Ok(serde_json::from_value(serde_json::Value::Object(
            record.clone(),
        ))?)
    }

    /// Overwrites this card's persisted fields from `record`, keeping its
    /// identity.
    pub fn apply_record(&mut self, record: &Record) -> Result<()> {
        let restored = Card::from_record(record)?;
        self.rect = restored.rect;
        self.content = restored.content;
        Ok(())
    }

    /// Label drawn on the card, including its numbering prefix if any.
    pub fn display_text(&self) -> String {
        let title = self.content.title();
        match &self.numbering {
            Some(prefix) if self.content.is_completable() => {
                let levels: String = prefix.iter().map(|n| format!("{n}.")).collect();
                format!("{levels} {title}")
            }
            _ => title,
        }
    }
}
