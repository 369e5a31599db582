// build.rs: bundle every locales/<lang>/main.ftl into OUT_DIR/locales.rs
use std::fs;
use std::io::Write;
use std::path::Path;

fn main() {
    let locales_dir = Path::new("./locales");
    println!("cargo:rerun-if-changed={}", locales_dir.display());

    let out_dir = std::env::var("OUT_DIR").unwrap();
    let dest_path = Path::new(&out_dir).join("locales.rs");
    let mut out = fs::File::create(&dest_path).unwrap();

    let mut bundles: Vec<(String, String)> = fs::read_dir(locales_dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .filter_map(|path| {
            let ftl_path = path.join("main.ftl");
            let locale = path.file_name()?.to_string_lossy().into_owned();
            let content = fs::read_to_string(&ftl_path).ok()?;
            println!("cargo:rerun-if-changed={}", ftl_path.display());
            Some((locale, content))
        })
        .collect();
    bundles.sort();

    writeln!(out, "use std::collections::HashMap;").unwrap();
    writeln!(out, "pub fn embedded_locales() -> HashMap<&'static str, &'static str> {{").unwrap();
    writeln!(out, "    let mut map = HashMap::new();").unwrap();
    for (locale, content) in bundles {
        writeln!(out, "    map.insert({:?}, {:?});", locale, content).unwrap();
    }
    writeln!(out, "    map").unwrap();
    writeln!(out, "}}").unwrap();
}
