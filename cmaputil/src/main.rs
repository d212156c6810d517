use std::error::Error;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use flate2::read::ZlibDecoder;
use log::{info, warn};
use pdf_cmap::{CMap, CidSystemInfo, CodespaceRange, WritingMode};
use serde::Serialize;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Inspect PDF CMap programs", arg_required_else_help = true)]
struct Args {
    /// Fail on malformed entries instead of skipping them.
    #[clap(long, global = true)]
    strict: bool,

    /// The file holds a FlateDecode compressed stream.
    #[clap(long, global = true)]
    flate: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the header and the extent of a CMap.
    Info {
        path: PathBuf,

        /// Print as JSON.
        #[clap(long)]
        json: bool,

        #[clap(short, long)]
        pretty: bool,
    },
    /// Decode a hex encoded string shown with a font that uses the CMap.
    Decode { path: PathBuf, hex: String },
}

#[derive(Debug, Serialize)]
struct CMapInfo<'a> {
    name: Option<&'a str>,
    version: Option<&'a str>,
    cmap_type: Option<i64>,
    writing_mode: WritingMode,
    cid_system_info: Option<&'a CidSystemInfo>,
    codespace_ranges: &'a [CodespaceRange],
    unicode_codes: u64,
    cid_codes: u64,
}

impl<'a> From<&'a CMap> for CMapInfo<'a> {
    fn from(cmap: &'a CMap) -> Self {
        CMapInfo {
            name: cmap.name(),
            version: cmap.version(),
            cmap_type: cmap.cmap_type(),
            writing_mode: cmap.writing_mode(),
            cid_system_info: cmap.cid_system_info(),
            codespace_ranges: cmap.codespace_ranges(),
            unicode_codes: cmap.unicode_code_count(),
            cid_codes: cmap.cid_code_count(),
        }
    }
}

fn load_cmap(path: &Path, flate: bool, strict: bool) -> Result<CMap, Box<dyn Error>> {
    info!("Open {}", path.display());
    let mut content = fs::read(path)?;
    if flate {
        let mut output = Vec::with_capacity(content.len() * 2);
        ZlibDecoder::new(&content[..]).read_to_end(&mut output)?;
        content = output;
    }
    Ok(CMap::parse(&content, !strict)?)
}

fn parse_hex(hex: &str) -> Result<Vec<u8>, Box<dyn Error>> {
    let digits: Vec<char> = hex
        .trim_start_matches('<')
        .trim_end_matches('>')
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if digits.len() % 2 == 1 {
        warn!("odd number of hex digits, padding the last one with 0");
    }
    digits
        .chunks(2)
        .map(|pair| {
            let byte: String = pair.iter().chain(std::iter::repeat(&'0')).take(2).collect();
            u8::from_str_radix(&byte, 16).map_err(|err| format!("invalid hex {:?}: {}", byte, err).into())
        })
        .collect()
}

fn print_info(cmap: &CMap, json: bool, pretty: bool) -> Result<(), Box<dyn Error>> {
    let info = CMapInfo::from(cmap);
    if json {
        let output = if pretty {
            serde_json::to_string_pretty(&info)?
        } else {
            serde_json::to_string(&info)?
        };
        println!("{}", output);
        return Ok(());
    }
    println!("Name: {}", info.name.unwrap_or("-"));
    println!("Version: {}", info.version.unwrap_or("-"));
    if let Some(cmap_type) = info.cmap_type {
        println!("Type: {}", cmap_type);
    }
    println!("Writing mode: {:?}", info.writing_mode);
    if let Some(cid_system_info) = info.cid_system_info {
        println!("CIDSystemInfo: {}", cid_system_info);
    }
    for range in info.codespace_ranges {
        println!("Codespace: {}", range);
    }
    println!("Codes mapped to Unicode: {}", info.unicode_codes);
    println!("Codes mapped to CIDs: {}", info.cid_codes);
    Ok(())
}

fn print_decoded(cmap: &CMap, bytes: &[u8]) {
    for code in cmap.codes(bytes) {
        let text = cmap.unicode(code).map_or_else(|| "-".to_string(), |text| format!("{:?}", text));
        let cid = cmap.cid(code).map_or_else(|| "-".to_string(), |cid| cid.to_string());
        println!("{}\t{}\t{}", code, text, cid);
    }
    println!("{}", cmap.decode_text(bytes));
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    match args.command {
        Command::Info { path, json, pretty } => {
            let cmap = load_cmap(&path, args.flate, args.strict)?;
            print_info(&cmap, json, pretty)
        }
        Command::Decode { path, hex } => {
            let cmap = load_cmap(&path, args.flate, args.strict)?;
            print_decoded(&cmap, &parse_hex(&hex)?);
            Ok(())
        }
    }
}

fn main() {
    env_logger::init();
    if let Err(err) = run(Args::parse()) {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}
