//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::achievements::AchievementView;
use crate::domain::{Chapter, ExerciseDefinition, ValidationResult};
use crate::session::SessionView;
use crate::validate::Answer;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    SetAnswer {
        exercise_id: String,
        answer: Answer,
    },
    Submit {
        exercise_id: String,
    },
    Reset {
        exercise_id: String,
    },
    ToggleHints {
        exercise_id: String,
    },
    Progress,
    Notifications,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Session {
        session: SessionView,
    },
    Submitted {
        result: ValidationResult,
        unlocked: Vec<String>,
        session: SessionView,
    },
    Hints {
        visible: bool,
        hints: Vec<String>,
    },
    Progress {
        progress: ProgressOut,
    },
    Notifications {
        unlocked: Vec<AchievementView>,
    },
    Error {
        message: String,
    },
}

/// DTO for exercise delivery. The answer key never leaves the server.
#[derive(Debug, Serialize)]
pub struct ExerciseOut {
    pub id: String,
    pub version: u32,
    pub chapter: Chapter,
    pub kind: &'static str,
    pub title: String,
    pub prompt: String,
    pub max_points: u32,
    pub hint_count: usize,
}

/// Convert the full `ExerciseDefinition` (internal) to the public DTO.
pub fn to_out(e: &ExerciseDefinition) -> ExerciseOut {
    ExerciseOut {
        id: e.id.clone(),
        version: e.version,
        chapter: e.chapter,
        kind: e.key.kind(),
        title: e.title.clone(),
        prompt: e.prompt.clone(),
        max_points: e.max_points,
        hint_count: e.hints.len(),
    }
}

#[derive(Debug, Serialize)]
pub struct ChapterOut {
    pub chapter: Chapter,
    pub title: &'static str,
    pub target: usize,
    pub exercises: Vec<ExerciseOut>,
}

#[derive(Debug, Serialize)]
pub struct ChapterProgressOut {
    pub chapter: Chapter,
    pub theory_read: bool,
    pub completed: usize,
    pub recorded: usize,
    pub target: usize,
    pub mastered: bool,
}

#[derive(Debug, Serialize)]
pub struct ExerciseProgressOut {
    pub exercise_id: String,
    pub chapter: Chapter,
    pub version: u32,
    pub completed: bool,
    pub score: u32,
    pub max_score: u32,
    pub attempts: u32,
    pub last_attempt: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ProgressOut {
    pub overall_percentage: f64,
    pub chapters: Vec<ChapterProgressOut>,
    pub exercises: Vec<ExerciseProgressOut>,
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct AnswerIn {
    pub answer: Answer,
}

#[derive(Debug, Serialize)]
pub struct SubmitOut {
    pub result: ValidationResult,
    pub unlocked: Vec<String>,
    pub session: SessionView,
}

#[derive(Debug, Serialize)]
pub struct HintsOut {
    pub visible: bool,
    pub hints: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct LearnerOut {
    pub learner_id: String,
}

#[derive(Debug, Serialize)]
pub struct NotificationsOut {
    pub unlocked: Vec<AchievementView>,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
