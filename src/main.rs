use mmio_sockdev::registry::DeviceRegistry;
use mmio_sockdev::transport;
use mmio_sockdev::{MmioDevice, MmioError, MmioManager, SockDevice, SockdevError};

mod guest;

const SOCKDEV_BASE: u64 = 0x1002_0000; // Where the firmware expects the device
const DEFAULT_PEER: &str = "127.0.0.1:7890";

fn run() -> Result<(), SockdevError> {
    env_logger::init();

    let peer = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_PEER.to_string());

    // Setup device types
    let mut registry = DeviceRegistry::default();
    let peer_spec = peer.clone();
    registry.register("mmio-sockdev", move || {
        let transport = transport::connect(&peer_spec)
            .map_err(|e| MmioError::DeviceError(e.to_string()))?;
        let device = SockDevice::new(transport, SOCKDEV_BASE)
            .map_err(|e| MmioError::DeviceError(e.to_string()))?;
        Ok(Box::new(device) as Box<dyn MmioDevice>)
    })?;

    // Setup devices
    let mut mmio_manager = MmioManager::default();
    let device = registry.create("mmio-sockdev")?;
    mmio_manager.register_device(SOCKDEV_BASE, device)?;
    log::info!("mmio-sockdev mapped at {SOCKDEV_BASE:#x}, peer at {peer}");

    // Run the guest smoke sequence
    guest::run_demo(&mut mmio_manager, SOCKDEV_BASE)?;

    Ok(())
}

fn main() {
    match run() {
        Ok(()) => {}
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
