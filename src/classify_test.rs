// src/classify_test.rs

#[cfg(test)]
mod tests {
    use crate::classify::{from_conf, BlastClassifier, Classifier, GcClassifier, ScratchFiles};
    use crate::defaults::{KEY_BLAST_DB, KEY_BLAST_EXE, KEY_CLASSIFIER, KEY_SCRATCH_DIR, NO_MATCH};
    use crate::error::Error;
    use crate::job_conf::JobConf;
    use bio::io::fasta;
    use std::fs;
    use std::path::Path;

    // Writes the given report to the -out path after copying the query
    // next to it, so tests can check what was staged.
    fn stub_script(dir: &Path, report: &str) -> String {
        let script = dir.join("stub.sh");
        let report_path = dir.join("canned.xml");
        fs::write(&report_path, report).unwrap();
        fs::write(
            &script,
            format!(
                "while [ $# -gt 0 ]; do\n  case \"$1\" in\n    -out) out=\"$2\" ;;\n    -query) query=\"$2\" ;;\n  esac\n  shift\ndone\n\
                 cp \"$query\" \"{}\"\ncp \"{}\" \"$out\"\n",
                dir.join("staged.fa").display(),
                report_path.display()
            ),
        )
        .unwrap();
        format!("sh {}", script.display())
    }

    fn blast_conf(scratch: &Path, exe: &str) -> JobConf {
        JobConf::new()
            .with(KEY_SCRATCH_DIR, scratch.to_string_lossy())
            .with(KEY_BLAST_DB, "refseq_rna")
            .with(KEY_BLAST_EXE, exe)
    }

    const HIT_XML: &str = "<BlastOutput><BlastOutput_iterations><Iteration><Iteration_hits>\
        <Hit><Hit_num>1</Hit_num><Hit_id>gi|42</Hit_id><Hit_def>Mus musculus actin</Hit_def></Hit>\
        </Iteration_hits></Iteration></BlastOutput_iterations></BlastOutput>";

    const NO_HIT_XML: &str = "<BlastOutput><BlastOutput_iterations><Iteration>\
        <Iteration_hits></Iteration_hits><Iteration_message>No hits found</Iteration_message>\
        </Iteration></BlastOutput_iterations></BlastOutput>";

    #[test]
    fn test_gc_classifier() {
        let mut gc = GcClassifier;
        let rec = fasta::Record::with_attrs("r", None, b"ggcAAT");
        assert_eq!(gc.classify(&rec).unwrap(), "50.0");
        let empty = fasta::Record::with_attrs("e", None, b"");
        assert_eq!(gc.classify(&empty).unwrap(), "0.0");
    }

    #[test]
    fn test_from_conf_requires_scratch_and_db() {
        let err = from_conf(&JobConf::new().with(KEY_BLAST_DB, "nt"), "attempt_1").err().unwrap();
        assert!(matches!(err, Error::MissingConfig(ref k) if k == KEY_SCRATCH_DIR));

        let err = from_conf(&JobConf::new().with(KEY_SCRATCH_DIR, "/tmp"), "attempt_1").err().unwrap();
        assert!(matches!(err, Error::MissingConfig(ref k) if k == KEY_BLAST_DB));
    }

    #[test]
    fn test_from_conf_gc_needs_no_tool_config() {
        let conf = JobConf::new().with(KEY_CLASSIFIER, "gc");
        assert!(from_conf(&conf, "attempt_1").is_ok());
    }

    #[test]
    fn test_scratch_names_follow_attempt() {
        let a = ScratchFiles::new(Path::new("/scratch"), "attempt_0001_m_000003_0");
        let b = ScratchFiles::new(Path::new("/scratch"), "attempt_0001_m_000003_1");
        assert_eq!(a.query, Path::new("/scratch/attempt_0001_m_000003_0-query.fa"));
        assert_ne!(a.query, b.query);
        assert_ne!(a.report, b.report);
    }

    #[test]
    fn test_scratch_files_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let files = ScratchFiles::new(dir.path(), "attempt_x");
        fs::write(&files.query, ">a\nAC\n").unwrap();
        let query = files.query.clone();
        drop(files);
        assert!(!query.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_blast_top_hit_label_and_staging() {
        let tool_dir = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let exe = stub_script(tool_dir.path(), HIT_XML);
        let mut classifier =
            BlastClassifier::from_conf(&blast_conf(scratch.path(), &exe), "attempt_7").unwrap();

        let rec = fasta::Record::with_attrs("A", None, b"ACGT");
        assert_eq!(classifier.classify(&rec).unwrap(), "gi|42 Mus musculus actin");

        let staged = fs::read_to_string(tool_dir.path().join("staged.fa")).unwrap();
        assert_eq!(staged, ">A\nACGT\n");
        // Nothing left behind in the shared scratch area
        assert_eq!(fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_blast_no_hits_is_sentinel() {
        let tool_dir = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let exe = stub_script(tool_dir.path(), NO_HIT_XML);
        let mut classifier =
            BlastClassifier::from_conf(&blast_conf(scratch.path(), &exe), "attempt_7").unwrap();

        let rec = fasta::Record::with_attrs("B", None, b"GGTT");
        assert_eq!(classifier.classify(&rec).unwrap(), NO_MATCH);
    }

    #[cfg(unix)]
    #[test]
    fn test_blast_failure_propagates() {
        let tool_dir = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let script = tool_dir.path().join("fail.sh");
        fs::write(&script, "exit 1\n").unwrap();
        let exe = format!("sh {}", script.display());
        let mut classifier =
            BlastClassifier::from_conf(&blast_conf(scratch.path(), &exe), "attempt_7").unwrap();

        let rec = fasta::Record::with_attrs("A", None, b"ACGT");
        let err = classifier.classify(&rec).unwrap_err();
        assert!(matches!(err, Error::ToolFailed { .. }), "{:?}", err);
        assert!(err.is_retryable());
        assert_eq!(fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_blast_garbage_report_is_error() {
        let tool_dir = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let exe = stub_script(tool_dir.path(), "Segmentation fault");
        let mut classifier =
            BlastClassifier::from_conf(&blast_conf(scratch.path(), &exe), "attempt_7").unwrap();

        let rec = fasta::Record::with_attrs("A", None, b"ACGT");
        assert!(matches!(classifier.classify(&rec), Err(Error::Report { .. })));
    }
}
