fn main() -> anyhow::Result<()> {
    pressure_monitor_lib::run()
}
