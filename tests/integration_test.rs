// ferrous-classify/tests/integration_test.rs

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn binary_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_ferrous-classify"))
}

// Helper function to create a FASTA file
fn create_fasta_file(dir: &Path, name: &str, content: &str) -> io::Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, content.as_bytes())?;
    Ok(path)
}

// Stand-in for the search tool: reports a fixed top hit for every query
#[cfg(unix)]
fn create_tool_stub(dir: &Path) -> io::Result<String> {
    let script = dir.join("blastn.sh");
    let body = r#"while [ $# -gt 0 ]; do
  if [ "$1" = "-out" ]; then out="$2"; fi
  shift
done
cat > "$out" <<'EOF'
<?xml version="1.0"?>
<BlastOutput>
  <BlastOutput_program>blastn</BlastOutput_program>
  <BlastOutput_iterations>
    <Iteration>
      <Iteration_hits>
        <Hit>
          <Hit_num>1</Hit_num>
          <Hit_id>gi|42|ref|NC_001</Hit_id>
          <Hit_def>Escherichia phage lambda</Hit_def>
          <Hit_accession>NC_001</Hit_accession>
          <Hit_len>48502</Hit_len>
        </Hit>
      </Iteration_hits>
    </Iteration>
  </BlastOutput_iterations>
</BlastOutput>
EOF
"#;
    fs::write(&script, body)?;
    Ok(format!("sh {}", script.display()))
}

fn run(args: &[&str]) -> io::Result<Output> {
    Command::new(binary_path()).args(args).output()
}

#[test]
fn test_gc_classification_end_to_end() -> io::Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let input = create_fasta_file(
        temp_dir.path(),
        "corpus.fa",
        ">r1 first\nGGCC\nGGCC\n>r2\nATAT\n>r3 third\nGCAT\n",
    )?;
    let out_dir = temp_dir.path().join("out");

    let output = run(&[
        "run",
        input.to_str().unwrap(),
        "-o",
        out_dir.to_str().unwrap(),
        "-D",
        "fasta.classifier=gc",
        "-s",
        "7",
        "-t",
        "2",
    ])?;
    assert!(output.status.success(), "Command failed with: {output:?}");

    let text = fs::read_to_string(out_dir.join("part-00000"))?;
    assert_eq!(text, "r1\t100.0\nr2\t0.0\nr3\t50.0\n");
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_search_classification_end_to_end() -> io::Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let input = create_fasta_file(temp_dir.path(), "corpus.fa", ">A\nACGT\n>B\nGGTT\n")?;
    let out_dir = temp_dir.path().join("out");
    let scratch = temp_dir.path().join("scratch");
    let tool = create_tool_stub(temp_dir.path())?;

    // Configuration from a properties file, with -D taking precedence
    let props = temp_dir.path().join("job.properties");
    fs::write(
        &props,
        format!(
            "# local job\njob.local.dir={}\nfasta.blastdb=wrong\n",
            scratch.display()
        ),
    )?;

    let output = run(&[
        "run",
        input.to_str().unwrap(),
        "-o",
        out_dir.to_str().unwrap(),
        "-c",
        props.to_str().unwrap(),
        "-D",
        "fasta.blastdb=nt",
        "-D",
        &format!("fasta.blast.exe={tool}"),
    ])?;
    assert!(output.status.success(), "Command failed with: {output:?}");

    let text = fs::read_to_string(out_dir.join("part-00000"))?;
    assert_eq!(
        text,
        "A\tgi|42|ref|NC_001 Escherichia phage lambda\nB\tgi|42|ref|NC_001 Escherichia phage lambda\n"
    );
    // Scratch files are removed after every classification
    assert_eq!(fs::read_dir(&scratch)?.count(), 0);
    Ok(())
}

#[test]
fn test_missing_search_config_fails() -> io::Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let input = create_fasta_file(temp_dir.path(), "corpus.fa", ">A\nACGT\n")?;
    let out_dir = temp_dir.path().join("out");

    let output = run(&[
        "run",
        input.to_str().unwrap(),
        "-o",
        out_dir.to_str().unwrap(),
        "-v",
        "1",
    ])?;
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("job.local.dir"), "stderr: {stderr}");
    assert!(!out_dir.join("part-00000").exists());
    Ok(())
}

#[test]
fn test_bad_define_is_rejected() -> io::Result<()> {
    let output = run(&["run", "in.fa", "-o", "out", "-D", "no-equals-sign"])?;
    assert!(!output.status.success());
    Ok(())
}

#[test]
fn test_splits_subcommand_counts_records() -> io::Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let input = create_fasta_file(
        temp_dir.path(),
        "corpus.fa",
        ">r1\nAAAA\nCCCC\n>r2\nGG\n>r3\nTTTTTTTT\n>r4\nA\n",
    )?;

    let output = run(&["splits", input.to_str().unwrap(), "-s", "10"])?;
    assert!(output.status.success(), "Command failed with: {output:?}");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[0], "offset\tlength\trecords");

    let total: usize = lines[1..]
        .iter()
        .map(|line| line.split('\t').nth(2).unwrap().parse::<usize>().unwrap())
        .sum();
    assert_eq!(total, 4);

    // Splits tile the file
    let offsets: Vec<u64> = lines[1..]
        .iter()
        .map(|line| line.split('\t').next().unwrap().parse().unwrap())
        .collect();
    assert_eq!(offsets[0], 0);
    assert!(offsets.windows(2).all(|w| w[1] - w[0] == 10));
    Ok(())
}
