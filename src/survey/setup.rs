// Survey setup step: what the evaluation is called and which phase it records

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::Phase;

/// Header of the evaluation a survey will create
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationHeader {
    pub name: String,
    pub description: Option<String>,
    pub phase: Phase,
}

/// Raw setup form as submitted by a client
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub phase: Option<String>,
}

impl EvaluationHeader {
    /// Validate the setup form into a header
    pub fn from_setup(request: SetupRequest) -> AppResult<Self> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(AppError::validation(
                "Please provide a name for this evaluation",
            ));
        }

        let phase = match request.phase.as_deref() {
            None => Phase::default(),
            Some(raw) => Phase::parse(raw).ok_or_else(|| {
                AppError::validation("Phase must be either \"before\" or \"after\"")
            })?,
        };

        let description = request
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        Ok(Self {
            name: name.to_string(),
            description,
            phase,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_name_rejected() {
        let err = EvaluationHeader::from_setup(SetupRequest {
            name: "   ".into(),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "Please provide a name for this evaluation");
    }

    #[test]
    fn test_defaults_to_before_phase() {
        let header = EvaluationHeader::from_setup(SetupRequest {
            name: " Q1 2025 Backend ".into(),
            description: Some("  ".into()),
            phase: None,
        })
        .unwrap();
        assert_eq!(header.name, "Q1 2025 Backend");
        assert_eq!(header.phase, Phase::Before);
        assert!(header.description.is_none());
    }

    #[test]
    fn test_unknown_phase_rejected() {
        let result = EvaluationHeader::from_setup(SetupRequest {
            name: "Q1".into(),
            description: None,
            phase: Some("during".into()),
        });
        assert!(result.is_err());
    }
}
