use std::str::FromStr;

use anyhow::{Context, Result};
use qsh::{Config, Parser};
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(
    about = "A decoder for the QScalp History (QSH) tick data format, version 4. Report bugs and request features at <https://github.com/example/qsh>."
)]
struct Opt {
    #[structopt(long = "--run_self_test", help = "Run the LEB128 codec's self-checks and exit.")]
    run_self_test: bool,

    #[structopt(long = "--read_file", name = "FILE", parse(from_os_str), help = "QSH file to decode.")]
    read_file: Option<std::path::PathBuf>,

    #[structopt(long = "--tz", help = "Zone frame timestamps are presented in (defaults to Europe/Moscow).")]
    tz: Option<String>,
}

fn main() -> Result<()> {
    let opt = Opt::from_args();

    if opt.run_self_test {
        run_self_test();
        return Ok(());
    }

    let file = opt.read_file.context("either --run_self_test or --read_file is required")?;
    let config = match opt.tz {
        Some(name) => Config {
            tz: chrono_tz::Tz::from_str(&name).map_err(|_| anyhow::anyhow!("unknown timezone: {}", name))?,
        },
        None => Config::default(),
    };

    let mut parser = Parser::open(&file, config).context("failed to open QSH file")?;
    println!("{:#?}", parser.header());
    println!("{:#?}", parser.stream_descriptor());

    for frame in parser.frames() {
        let frame = frame.context("decoder error")?;
        println!("{}", serde_json::to_string_pretty(&frame)?);
    }

    Ok(())
}

/// Round-trips a handful of reference LEB128 values through the public
/// codec, the same sanity check the upstream QScalp terminal runs before
/// trusting its own encoder.
fn run_self_test() {
    let unsigned_vectors: &[u64] = &[0, 1, 127, 128, 300, 624485, 268_435_455];
    for &n in unsigned_vectors {
        let encoded = qsh::encode_unsigned(n, qsh::ULEB_MAX_WIDTH).expect("encode");
        let (decoded, _) = qsh::decode_unsigned(&encoded, qsh::ULEB_MAX_WIDTH).expect("decode");
        assert_eq!(decoded, n, "unsigned round-trip failed for {}", n);
    }

    let signed_vectors: &[i64] = &[0, -1, 1, -624485, 624485, i64::from(i32::MIN), i64::from(i32::MAX)];
    for &n in signed_vectors {
        let encoded = qsh::encode_signed(n, qsh::SLEB_MAX_WIDTH).expect("encode");
        let (decoded, _) = qsh::decode_signed(&encoded, qsh::SLEB_MAX_WIDTH).expect("decode");
        assert_eq!(decoded, n, "signed round-trip failed for {}", n);
    }

    println!("self-test passed: {} unsigned, {} signed vectors", unsigned_vectors.len(), signed_vectors.len());
}
