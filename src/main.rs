use std::{env, fs::File, process};

use cfr_class_file::{
    ClassFile, ClassFileError, NoVerification, ReadFlags, ReadOptions, RESULT_FORMAT_ERROR,
    RESULT_OK,
};
use memmap::Mmap;

fn main() {
    pretty_env_logger::init();

    let Some(path) = env::args().nth(1) else {
        eprintln!("usage: cfdump <file.class>");
        process::exit(RESULT_FORMAT_ERROR);
    };
    let mmap = match File::open(&path).and_then(|file| unsafe { Mmap::map(&file) }) {
        Ok(mmap) => mmap,
        Err(e) => {
            eprintln!("{}: {}", path, e);
            process::exit(RESULT_FORMAT_ERROR);
        }
    };

    let options = read_options();
    log::debug!("Reading {} with {:?}", path, options);

    match ClassFile::parse_with(&mmap, options, &mut NoVerification) {
        Ok(class_file) => {
            if let Err(e) = print_summary(&class_file) {
                log::warn!("Incomplete summary: {}", e);
            }
            process::exit(RESULT_OK);
        }
        Err(e) => {
            match e.record() {
                Some(record) => eprintln!("{}", record),
                None => eprintln!("{}", e),
            }
            process::exit(e.result_code());
        }
    }
}

/// Options from `CFR_VERIFY`, `CFR_STRIP_DEBUG`, `CFR_MAX_MAJOR` and `CFR_SEGMENT_SIZE`.
fn read_options() -> ReadOptions {
    let mut options = ReadOptions::default();

    if env_flag("CFR_VERIFY") {
        options.flags.insert(ReadFlags::STATIC_VERIFICATION);
    }
    if env_flag("CFR_STRIP_DEBUG") {
        options.flags.insert(ReadFlags::STRIP_DEBUG_ATTRIBUTES);
    }
    if let Some(major) = env_number("CFR_MAX_MAJOR") {
        options.max_major_version = major;
    }
    if let Some(size) = env_number("CFR_SEGMENT_SIZE") {
        options.segment_size = size;
    }

    options
}

fn env_flag(name: &str) -> bool {
    env::var(name).map_or(false, |value| !matches!(value.as_str(), "" | "0" | "false"))
}

fn env_number<T: std::str::FromStr>(name: &str) -> Option<T> {
    let value = env::var(name).ok()?;
    match value.parse() {
        Ok(number) => Some(number),
        Err(_) => {
            log::warn!("Ignoring {}={}", name, value);
            None
        }
    }
}

fn print_summary(class_file: &ClassFile) -> Result<(), ClassFileError> {
    println!(
        "class {} (version {}.{})",
        class_file.class_name()?,
        class_file.major_version,
        class_file.minor_version
    );
    println!("  access flags: {:?}", class_file.access_flags);
    if let Some(super_class) = class_file.super_class()? {
        println!("  extends {}", super_class);
    }
    for interface in class_file.interface_names()? {
        println!("  implements {}", interface);
    }
    println!("  constant pool: {} slots", class_file.constant_pool.count());

    println!();
    for field in &class_file.fields {
        println!(
            "  field {} {}",
            class_file.field_name(field)?,
            class_file.field_descriptor(field)?
        );
    }
    for method in &class_file.methods {
        let code_length = method.code().map_or(0, |code| code.code.len());
        println!(
            "  method {}{} ({} bytes of code)",
            class_file.method_name(method)?,
            class_file.method_descriptor(method)?,
            code_length
        );
    }

    println!();
    for attribute in class_file.attributes.iter() {
        println!("  attribute {:?} ({} bytes)", attribute.kind, attribute.length);
    }

    Ok(())
}
