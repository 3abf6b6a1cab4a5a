#![warn(clippy::all, rust_2018_idioms)]
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide console window on Windows in release

use rand::Rng;

use nvgpu_timeline::data::{CallNode, DataSource, FetchError, RegionRecord, RegionSnapshot};

#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use clap::Parser;
    use std::path::PathBuf;

    use nvgpu_timeline::data::{DataSource, FetchError, FileDataSource, StorageLocation};

    use super::RandomDataSource;

    /// Timeline of CUDA-related runtime per profiled region.
    #[derive(Debug, Parser)]
    #[command(version)]
    pub struct Args {
        /// Read regions from this `regions.json` file.
        #[arg(long, conflicts_with_all = ["storage", "demo"])]
        pub regions: Option<PathBuf>,

        /// Root of the profiler's result storage.
        #[arg(long, requires_all = ["identifier", "entity", "node"])]
        pub storage: Option<PathBuf>,

        #[arg(long, default_value = "")]
        pub identifier: String,

        #[arg(long, default_value = "")]
        pub entity: String,

        #[arg(long, default_value = "")]
        pub node: String,

        /// Show randomly generated regions.
        #[arg(long, conflicts_with_all = ["regions", "storage"])]
        pub demo: bool,

        /// Always render durations in milliseconds (overrides the saved preference).
        #[arg(long)]
        pub always_ms: bool,
    }

    impl Args {
        pub fn data_source(&self) -> Result<Box<dyn DataSource + Send>, FetchError> {
            if self.demo {
                return Ok(Box::<RandomDataSource>::default());
            }
            if let Some(path) = &self.regions {
                return Ok(Box::new(FileDataSource::new(path)));
            }
            if let Some(storage) = &self.storage {
                let location = StorageLocation {
                    storage: storage.clone(),
                    identifier: self.identifier.clone(),
                    entity: self.entity.clone(),
                    node: self.node.clone(),
                };
                return Ok(Box::new(FileDataSource::from_storage(&location)?));
            }
            // No source given, fall back to the demo data
            Ok(Box::<RandomDataSource>::default())
        }
    }

}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> std::process::ExitCode {
    use clap::Parser;

    tracing_subscriber::fmt::init();

    let args = cli::Args::parse();
    let source = match args.data_source() {
        Ok(source) => source,
        Err(e) => {
            tracing::error!("{}", e);
            return std::process::ExitCode::FAILURE;
        }
    };
    tracing::info!(?args, "starting viewer");
    nvgpu_timeline::app::start(source, args.always_ms.then_some(true));
    std::process::ExitCode::SUCCESS
}

#[cfg(target_arch = "wasm32")]
fn main() {
    nvgpu_timeline::app::start(Box::<RandomDataSource>::default(), None);
}

const CALLS: &[&str] = &[
    "cudaMalloc",
    "cudaFree",
    "cudaMemcpy",
    "cudaMemcpyAsync",
    "cudaLaunchKernel",
    "cudaStreamSynchronize",
    "cudaDeviceSynchronize",
    "cudaEventRecord",
];

const DRIVER_CALLS: &[&str] = &[
    "cuMemAlloc",
    "cuMemcpyHtoD",
    "cuMemcpyDtoH",
    "cuLaunchKernel",
    "cuModuleLoad",
    "cuCtxSynchronize",
];

#[derive(Default)]
struct RandomDataSource {
    regions: Option<u64>,
}

impl RandomDataSource {
    fn generate_calls(
        &self,
        rng: &mut impl Rng,
        budget: i64,
        level: i32,
        max_level: i32,
    ) -> Vec<(String, CallNode)> {
        let names = if level == 0 { CALLS } else { DRIVER_CALLS };
        let count = rng.gen_range(0..=names.len().min(4));
        let mut calls = Vec::new();
        for name in names.iter().take(count) {
            let length = rng.gen_range(0..=budget / count.max(1) as i64);
            let mut call = CallNode::leaf(length);
            if level < max_level {
                for (child_name, child) in self.generate_calls(rng, length, level + 1, max_level) {
                    call.children.insert(child_name, child);
                }
            }
            calls.push((name.to_string(), call));
        }
        calls
    }
}

impl DataSource for RandomDataSource {
    fn fetch_regions(&mut self) -> Result<RegionSnapshot, FetchError> {
        const LEVELS: i32 = 2;
        let mut rng = rand::thread_rng();
        let regions = *self.regions.get_or_insert_with(|| rand::thread_rng().gen_range(4..32));

        let mut start = 0;
        let mut snapshot = RegionSnapshot::new();
        for i in 0..regions {
            start += rng.gen_range(0..200_000_000);
            let length = rng.gen_range(50_000..2_500_000_000);
            let mut region = RegionRecord::new(start, length);
            for (name, call) in self.generate_calls(&mut rng, length, 0, LEVELS) {
                region = region.with_call(name, call);
            }
            snapshot.insert(format!("region_{}", i), region);
            start += length;
        }
        Ok(snapshot)
    }
}
