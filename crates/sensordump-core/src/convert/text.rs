use log::info;

use super::run::RunState;
use super::{ConvertError, ensure_parent, output_for, require_file};
use crate::Report;
use crate::cloud::PointCloud;
use crate::config::{ConversionConfig, OutputFormat};
use crate::decode::{LengthPolicy, reshape_scalars};
use crate::diagnostics::ID_EMPTY_FRAME;
use crate::sink::write_cloud_file;
use crate::source::read_text_dump;

const CONVERSION: &str = "text";

/// Convert a free-text numeric dump into a point-cloud file.
///
/// Every number in the text is taken in order and grouped into xyz triples.
/// A trailing incomplete triple is dropped with a warning unless the
/// configuration asks for the skip-frame policy. The whole dump is frame 0.
/// `config.output` is the target file; with several formats each gets the
/// format's extension.
pub fn convert_text_dump(config: &ConversionConfig) -> Result<Report, ConvertError> {
    require_file(&config.input)?;
    let formats = config.formats_or(&[OutputFormat::Ply]);
    let targets = formats
        .iter()
        .map(|format| {
            format.cloud_format().ok_or(ConvertError::UnsupportedFormat {
                conversion: CONVERSION,
                format: *format,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    ensure_parent(&config.output)?;

    let mut state = RunState::new(CONVERSION);
    let values = read_text_dump(&config.input)?;
    info!("{}: {} numeric token(s)", config.input.display(), values.len());

    let decoded = reshape_scalars::<3>(&values, config.length_policy_or(LengthPolicy::Truncate));
    state.diagnostics.record_issues(None, &decoded.issues);
    if values.is_empty() {
        state
            .diagnostics
            .info(None, ID_EMPTY_FRAME, "no numeric tokens found");
    }
    let skipped = decoded.is_empty() && !values.is_empty();
    let cloud = PointCloud::from_xyz(decoded.records);

    let single = targets.len() == 1;
    for format in targets {
        let path = output_for(&config.output, format.extension(), single);
        write_cloud_file(format.writer().as_ref(), &cloud, &path)?;
        state.output(&path);
    }
    if skipped {
        state.skipped(0, None);
    } else {
        state.converted(0, None, cloud.len(), cloud.stats());
    }
    state.finish(&config.input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ID_LENGTH_MISMATCH;
    use crate::sink::read_ply_file;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn trailing_tokens_are_dropped_with_warning() {
        let temp = TempDir::new().expect("tempdir");
        let input = temp.path().join("dump.txt");
        fs::write(&input, "1.0 2.0 3.0 4.0 5.0").unwrap();
        let output = temp.path().join("out/cloud.ply");

        let report = convert_text_dump(&ConversionConfig::new(&input, &output)).unwrap();
        assert_eq!(read_ply_file(&output).unwrap().points, vec![[1.0, 2.0, 3.0]]);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].id, ID_LENGTH_MISMATCH);
        assert!(report.diagnostics[0].message.contains("2 value(s) dropped"));
        assert_eq!(report.frames[0].records, 1);
    }

    #[test]
    fn skip_frame_policy_reports_skipped_frame() {
        let temp = TempDir::new().expect("tempdir");
        let input = temp.path().join("dump.txt");
        fs::write(&input, "1.0 2.0 3.0 4.0 5.0").unwrap();
        let output = temp.path().join("cloud.ply");
        let mut config = ConversionConfig::new(&input, &output);
        config.options.length_policy = Some(LengthPolicy::SkipFrame);

        let report = convert_text_dump(&config).unwrap();
        let summary = report.frames_summary.as_ref().unwrap();
        assert_eq!(summary.frames_converted, 0);
        assert_eq!(summary.frames_skipped, 1);
        assert_eq!(summary.records_total, 0);
        assert_eq!(report.frames[0].status, crate::FrameStatus::Skipped);
        assert!(read_ply_file(&output).unwrap().is_empty());
        assert_eq!(report.diagnostics[0].id, ID_LENGTH_MISMATCH);
    }

    #[test]
    fn empty_dump_writes_empty_cloud() {
        let temp = TempDir::new().expect("tempdir");
        let input = temp.path().join("dump.txt");
        fs::write(&input, "no numbers here").unwrap();
        let output = temp.path().join("cloud.ply");

        let report = convert_text_dump(&ConversionConfig::new(&input, &output)).unwrap();
        assert!(read_ply_file(&output).unwrap().is_empty());
        assert!(!report.has_warnings());
    }

    #[test]
    fn several_formats_use_their_extensions() {
        let temp = TempDir::new().expect("tempdir");
        let input = temp.path().join("dump.txt");
        fs::write(&input, "0 0 0\n1 1 1\n").unwrap();
        let config = ConversionConfig::new(&input, temp.path().join("cloud"))
            .with_formats([OutputFormat::Ply, OutputFormat::Xyz]);

        let report = convert_text_dump(&config).unwrap();
        assert_eq!(report.outputs.len(), 2);
        assert!(temp.path().join("cloud.ply").is_file());
        assert!(temp.path().join("cloud.xyz").is_file());
    }

    #[test]
    fn raster_format_is_rejected() {
        let temp = TempDir::new().expect("tempdir");
        let input = temp.path().join("dump.txt");
        fs::write(&input, "1 2 3").unwrap();
        let config = ConversionConfig::new(&input, temp.path().join("cloud.png"))
            .with_formats([OutputFormat::Png]);
        assert!(matches!(
            convert_text_dump(&config),
            Err(ConvertError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn missing_input_aborts() {
        let temp = TempDir::new().expect("tempdir");
        let config = ConversionConfig::new(temp.path().join("nope.txt"), temp.path().join("o.ply"));
        assert!(matches!(
            convert_text_dump(&config),
            Err(ConvertError::MissingInput(_))
        ));
    }
}
