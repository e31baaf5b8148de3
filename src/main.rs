#![no_std]
#![no_main]

use esp_hal::clock::CpuClock;
use esp_hal::rmt::{Rmt, TxChannelConfig, TxChannelCreator};
use esp_hal::rng::Rng;
use esp_hal::time::Rate;
use esp_hal::timer::timg::TimerGroup;
use esp_println::println;

// WiFi imports
use esp_wifi::wifi;

// Embassy imports
use embassy_net::{Config, Stack, StackResources};
use embassy_time::{Delay, Duration, Timer};
use esp_hal_embassy::Executor;
use static_cell::StaticCell;

// Import our library modules
use weather_strip::config;
use weather_strip::request::Request;
use weather_strip::state_machine::{Action, CycleEvent, CycleStateMachine};
use weather_strip::tcp::TcpConnection;
use weather_strip::wifi::WiFiManager;
use weather_strip::ws2812::RmtWriter;
use weather_strip::{PixelSink, SmartLedStrip, TemperatureRenderer, forecast_request, run_fetch_cycle};

// Add app descriptor for espflash compatibility
esp_bootloader_esp_idf::esp_app_desc!();

// Use the concrete channel type
type ConcreteChannel = esp_hal::rmt::Channel<esp_hal::Blocking, 0>;
type StripType = SmartLedStrip<RmtWriter<ConcreteChannel>, { config::STRIP_LEN }>;

// Static cells for embassy components
static WIFI_INIT_CELL: StaticCell<esp_wifi::EspWifiController<'static>> = StaticCell::new();
static WIFI_MANAGER_CELL: StaticCell<WiFiManager<'static>> = StaticCell::new();
static STRIP_CELL: StaticCell<StripType> = StaticCell::new();

// Static executor for embassy tasks
static EXECUTOR: StaticCell<Executor> = StaticCell::new();

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    println!("[MAIN] Panic: {}", info);
    loop {}
}

// Embassy task to run the network stack
#[embassy_executor::task]
async fn net_task(
    mut runner: embassy_net::Runner<'static, esp_wifi::wifi::WifiDevice<'static>>,
) -> ! {
    runner.run().await
}

/// Fetch-render-sleep loop; owns the strip, so only one render ever runs
#[embassy_executor::task]
async fn cycle_task(
    wifi_manager: &'static mut WiFiManager<'static>,
    stack: Stack<'static>,
    strip: &'static mut StripType,
    request: Request,
) -> ! {
    let mut rx_buffer = [0u8; 1536];
    let mut tx_buffer = [0u8; 512];
    let mut connection = TcpConnection::new(
        stack,
        &mut rx_buffer,
        &mut tx_buffer,
        config::WEB_SERVER,
        config::WEB_PORT,
    );

    let renderer = TemperatureRenderer::default();
    let mut state_machine = CycleStateMachine::default();
    let mut delay = Delay;

    println!("[STATE] Starting fetch cycle task");
    state_machine.handle_event(CycleEvent::SystemStarted);

    loop {
        for action in state_machine.update() {
            match action {
                Action::ConnectWiFi => {
                    match wifi_manager
                        .connect(config::WIFI_SSID, config::WIFI_PASSWORD)
                        .await
                    {
                        Ok(()) => state_machine.handle_event(CycleEvent::WiFiConnected),
                        Err(_) => state_machine.handle_event(CycleEvent::WiFiConnectionFailed),
                    };
                }
                Action::FetchForecast => {
                    println!("[HTTP] Request: {}", request.as_str());
                    let result = run_fetch_cycle(
                        &mut connection,
                        request.as_bytes(),
                        config::RECEIVE_TIMEOUT,
                    )
                    .await;
                    wifi_manager.disconnect().await;

                    match result {
                        Ok(report) => {
                            println!(
                                "[HTTP] {} bytes, min={} now={} max={}",
                                report.received,
                                report.sample.minimum,
                                report.sample.current,
                                report.sample.maximum
                            );
                            state_machine.handle_event(CycleEvent::FetchCompleted(report.sample))
                        }
                        Err(e) => state_machine.handle_event(CycleEvent::FetchFailed(e)),
                    };
                }
                Action::Render(sample) => {
                    match renderer
                        .render(
                            strip,
                            &mut delay,
                            sample.minimum,
                            sample.current,
                            sample.maximum,
                        )
                        .await
                    {
                        Ok(()) => state_machine.handle_event(CycleEvent::RenderCompleted),
                        Err(e) => state_machine.handle_event(CycleEvent::RenderFailed(e)),
                    };
                }
                Action::ClearStrip => {
                    if let Err(e) = strip.clear() {
                        println!("[LED] Failed to clear strip: {:?}", e);
                    }
                }
                Action::Sleep(seconds) => {
                    for countdown in (0..=seconds).rev() {
                        println!("[MAIN] {}... ", countdown);
                        Timer::after(Duration::from_secs(1)).await;
                    }
                    println!("[MAIN] Starting again!");
                    state_machine.handle_event(CycleEvent::SleepElapsed);
                }
                Action::Backoff(duration) => {
                    Timer::after(duration).await;
                    state_machine.handle_event(CycleEvent::SleepElapsed);
                }
                Action::LogError(error) => {
                    println!("[STATE] Error logged: {:?}", error);
                }
            }
        }

        // Small delay to prevent busy loop
        Timer::after(Duration::from_millis(10)).await;
    }
}

#[esp_hal::main]
fn main() -> ! {
    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    // Initialize heap allocator for WiFi (72KB)
    esp_alloc::heap_allocator!(size: 72 * 1024);

    // Initialize embassy time system
    let timer_group0 = TimerGroup::new(peripherals.TIMG0);
    esp_hal_embassy::init(timer_group0.timer0);

    // Initialize LED strip first so the power indicator comes up early
    println!(
        "[LED] Setting up {} LEDs on GPIO{}...",
        config::STRIP_LEN,
        config::LED_DATA_PIN
    );
    let rmt = match Rmt::new(peripherals.RMT, Rate::from_mhz(10)) {
        Ok(rmt) => rmt,
        Err(e) => {
            println!("[LED] Failed to initialize RMT: {:?}", e);
            panic!("RMT initialization failed");
        }
    };
    let tx_config = TxChannelConfig::default()
        .with_clk_divider(1)
        .with_idle_output_level(esp_hal::gpio::Level::Low)
        .with_idle_output(false)
        .with_carrier_modulation(false);
    let rmt_channel = rmt.channel0.configure(peripherals.GPIO10, tx_config).unwrap();

    let strip = STRIP_CELL.init(SmartLedStrip::new(RmtWriter::new(rmt_channel)));
    if let Err(e) = strip.set_power(true) {
        println!("[LED] Power indicator failed: {:?}", e);
    }
    println!("[LED] LED strip initialized");

    // Initialize WiFi driver
    let timer_group1 = TimerGroup::new(peripherals.TIMG1);
    let mut rng = Rng::new(peripherals.RNG);
    let seed = u64::from(rng.random()) << 32 | u64::from(rng.random());
    let wifi_init = esp_wifi::init(timer_group1.timer0, rng, peripherals.RADIO_CLK).unwrap();
    let wifi_init_ref = WIFI_INIT_CELL.init(wifi_init);

    let (wifi_controller, wifi_interfaces) = wifi::new(wifi_init_ref, peripherals.WIFI).unwrap();
    let wifi_device = wifi_interfaces.sta;

    println!("[WIFI] WiFi controller and device created successfully");

    // Create embassy-net stack with DHCP configuration (DHCP, DNS, TCP)
    static STACK_RESOURCES: StaticCell<StackResources<4>> = StaticCell::new();
    let stack_resources = STACK_RESOURCES.init(StackResources::new());

    let net_config = Config::dhcpv4(Default::default());
    let (stack, runner) = embassy_net::new(wifi_device, net_config, stack_resources, seed);

    let wifi_manager = WIFI_MANAGER_CELL.init(WiFiManager::new(wifi_controller, stack));

    let request = match forecast_request() {
        Ok(request) => request,
        Err(e) => {
            println!("[HTTP] Request does not fit: {:?}", e);
            panic!("invalid forecast request");
        }
    };

    // Initialize embassy executor and run tasks
    let executor = EXECUTOR.init(Executor::new());
    executor.run(|spawner| {
        println!("[MAIN] Spawning network task...");
        spawner.spawn(net_task(runner)).ok();

        println!("[MAIN] Spawning fetch cycle task...");
        match spawner.spawn(cycle_task(wifi_manager, stack, strip, request)) {
            Ok(_) => println!("[MAIN] Fetch cycle task spawned successfully"),
            Err(e) => println!("[MAIN] Failed to spawn fetch cycle task: {:?}", e),
        }
    });
}
