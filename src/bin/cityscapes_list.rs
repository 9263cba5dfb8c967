use anyhow::Context;
use bdlseg::dataset::data_loaders::cityscapes::list_split;
use bdlseg::dataset::data_transformers::list_file::write_list_file;
use std::path::PathBuf;

fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let mut args = std::env::args().skip(1);
    let usage = "usage: cityscapes_list <root> <split> <out>";
    let root = PathBuf::from(args.next().context(usage)?);
    let split = args.next().context(usage)?;
    let out = PathBuf::from(args.next().context(usage)?);

    let pairs = list_split(&root, &split)?;
    write_list_file(&out, &pairs)?;
    log::info!("Wrote {} pairs to {}", pairs.len(), out.display());
    Ok(())
}
