//! Default TOML config template with inline documentation comments.

pub(crate) fn default_config_toml() -> &'static str {
    r##"# termlink configuration
# Only override what you want to change -- missing fields use defaults.

[server]
# host = "0.0.0.0"
# port = 17500

[terminal]
# program = "codex"          # resolved via PATH, then ~/.nvm/versions/node/*/bin
# args = []
# command = "codex --full-auto"   # full command line, overrides program/args
# working_directory = "~/projects"
# allow_shell_fallback = false
# fallback_shell = "/bin/bash"
# read_chunk = 4096          # 256-65536 bytes
# stop_timeout_ms = 2000     # 100-60000

[terminal.env]
# OPENAI_API_KEY = "..."

[runner]
# log_capacity = 400         # lines kept per process
# stop_timeout_ms = 4000     # 100-120000
# metro_port = 8081          # 1024-65535
# mode = "adb"               # adb, lan
# device_tool = "adb"
# device_timeout_ms = 30000  # 1000-600000
# scan_depth = 2             # 0-8

[runner.env]
# ANDROID_HOME = "/opt/android-sdk"

[logging]
# level = "info"             # trace, debug, info, warn, error
"##
}
