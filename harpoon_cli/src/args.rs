use std::path::PathBuf;

use clap::Parser;
use harpoon_common::{LockConfig, SynthConfig};

/// HARPOON - Lock a gate-level netlist behind an authentication controller
#[derive(Parser, Debug)]
#[command(name = "harpoon")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the gate-level Verilog netlist
    #[arg(short = 'f', long)]
    pub netlist: PathBuf,

    /// Name of the top-level module to lock
    #[arg(short = 't', long)]
    pub top: String,

    /// Number of key digits, one per clock cycle
    #[arg(short = 'k', long, default_value_t = 5)]
    pub key_length: usize,

    /// Number of internal nodes to lock (width of the inverting vector)
    #[arg(short = 'i', long, default_value_t = 5)]
    pub invert_vec_length: usize,

    /// Seed for node sampling, key and decoy generation
    #[arg(long)]
    pub seed: Option<u64>,

    /// Clock input of the design
    #[arg(long, default_value = "CK")]
    pub clock: String,

    /// Directory for the generated files
    #[arg(short = 'o', long, default_value = "generated")]
    pub output_dir: PathBuf,

    /// Skip the yosys synthesis step
    #[arg(long, default_value_t = false)]
    pub no_synth: bool,

    /// Path to the yosys binary (searched on PATH by default)
    #[arg(long)]
    pub yosys: Option<PathBuf>,

    /// Random vectors for the locked-vs-original self-check
    #[arg(long, default_value_t = 64)]
    pub samples: usize,
}

impl Args {
    /// Convert command-line arguments into a run configuration
    pub fn to_config(&self) -> LockConfig {
        let synth = match &self.yosys {
            Some(path) => SynthConfig::new().with_yosys(path),
            None => SynthConfig::new(),
        };

        LockConfig::builder()
            .key_length(self.key_length)
            .lock_count(self.invert_vec_length)
            .seed(self.seed)
            .clock(self.clock.as_str())
            .output_dir(&self.output_dir)
            .synthesize(!self.no_synth)
            .equivalence_samples(self.samples)
            .synth(synth)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["harpoon", "-f", "s27.v", "-t", "s27"]).unwrap();
        let config = args.to_config();
        assert_eq!(config.key_length, 5);
        assert_eq!(config.lock_count, 5);
        assert_eq!(config.seed, None);
        assert_eq!(config.clock, "CK");
        assert!(config.synthesize);
        assert_eq!(config.output_dir, PathBuf::from("generated"));
    }

    #[rstest]
    #[case(&["-k", "8"], 8, 5)]
    #[case(&["-i", "3"], 5, 3)]
    #[case(&["--key-length", "2", "--invert-vec-length", "7"], 2, 7)]
    fn lengths(#[case] extra: &[&str], #[case] key_length: usize, #[case] lock_count: usize) {
        let argv = ["harpoon", "-f", "s27.v", "-t", "s27"].iter().chain(extra);
        let config = Args::try_parse_from(argv).unwrap().to_config();
        assert_eq!(config.key_length, key_length);
        assert_eq!(config.lock_count, lock_count);
    }

    #[test]
    fn flags() {
        let args = Args::try_parse_from([
            "harpoon", "-f", "s27.v", "-t", "s27", "--seed", "42", "--no-synth", "-o", "out",
            "--yosys", "/opt/yosys", "--samples", "0",
        ])
        .unwrap();
        let config = args.to_config();
        assert_eq!(config.seed, Some(42));
        assert!(!config.synthesize);
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.synth.yosys, Some(PathBuf::from("/opt/yosys")));
        assert_eq!(config.equivalence_samples, 0);
    }

    #[test]
    fn netlist_and_top_are_required() {
        assert!(Args::try_parse_from(["harpoon", "-t", "s27"]).is_err());
        assert!(Args::try_parse_from(["harpoon", "-f", "s27.v"]).is_err());
    }
}
