//! Record sources built from configuration

mod replay;
mod synthetic;

pub use replay::ReplayRecordSource;
pub use synthetic::SyntheticRecordSource;

use contracts::{ContractError, RecordSource, SourceConfig, SourceId, SourceType};

use crate::error::{IngestionError, Result};

/// Build the record source described by `config`
pub fn from_config(config: &SourceConfig) -> Result<Box<dyn RecordSource>> {
    let source_id = SourceId::from(config.id.as_str());
    let wrap = |error: ContractError| IngestionError::Source {
        source_id: config.id.clone(),
        error,
    };

    match config.source_type {
        SourceType::Synthetic => {
            let source = SyntheticRecordSource::new(source_id, config.synthetic.clone())
                .map_err(wrap)?;
            Ok(Box::new(source))
        }
        SourceType::Replay => {
            let path = config.path.as_ref().ok_or_else(|| {
                wrap(ContractError::config_validation(
                    format!("sources.{}.path", config.id),
                    "replay source requires a path",
                ))
            })?;
            Ok(Box::new(
                ReplayRecordSource::open(source_id, path).map_err(wrap)?,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::SyntheticSourceConfig;

    #[test]
    fn test_replay_without_path_fails() {
        let config = SourceConfig {
            id: "cam".into(),
            source_type: SourceType::Replay,
            path: None,
            synthetic: SyntheticSourceConfig::default(),
        };
        let Err(err) = from_config(&config) else {
            panic!("replay source without a path must be rejected");
        };
        assert!(matches!(
            err,
            IngestionError::Source {
                error: ContractError::ConfigValidation { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_synthetic_from_config() {
        let config = SourceConfig {
            id: "lidar".into(),
            source_type: SourceType::Synthetic,
            path: None,
            synthetic: SyntheticSourceConfig {
                realtime: false,
                max_records: Some(1),
                ..Default::default()
            },
        };
        let mut source = from_config(&config).unwrap();
        assert_eq!(source.source_id(), "lidar");
        assert!(source.next_record().unwrap().is_some());
        assert!(source.next_record().unwrap().is_none());
    }
}
