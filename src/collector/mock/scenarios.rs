//! Pre-built mock filesystem scenarios for testing.
//!
//! These scenarios provide realistic `/proc` and `/sys` states captured from a
//! Raspberry Pi 3 running Raspberry Pi OS.

use super::filesystem::MockFs;
use crate::collector::network::NETWORK_COUNTERS;

impl MockFs {
    /// Creates a quad-core Pi with an SD card, a USB disk, a wired and a
    /// wireless interface and a thermal zone.
    pub fn raspberry_pi() -> Self {
        let fs = Self::new();

        fs.add_file(
            "/proc/stat",
            "\
cpu  144235 1352 40236 4129814 8264 0 2114 0 0 0
cpu0 36980 316 10555 1030146 2166 0 1405 0 0 0
cpu1 35871 374 9832 1033538 2016 0 291 0 0 0
cpu2 35594 337 9918 1033101 2048 0 227 0 0 0
cpu3 35790 325 9931 1033029 2034 0 191 0 0 0
intr 60981378 0 10208 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0
ctxt 103719283
btime 1603287371
processes 41628
procs_running 1
procs_blocked 0
softirq 13658457 2 2858367 33 183564 0 0 498376 5212735 0 4905380
",
        );

        fs.add_file(
            "/proc/diskstats",
            "   1       0 ram0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0
   1       1 ram1 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0
   7       0 loop0 58 0 2172 37 0 0 0 0 0 112 37 0 0 0 0 0 0
   8       0 sda 52817 160284 5969575 1616869 14792321 2261382 1286890664 204844813 0 93397930 206525131 0 0 0 0 157356 63448
   8       1 sda1 52601 160284 5962911 1615988 14781214 2261382 1286890664 204831210 0 93379750 206447198 0 0 0 0 0 0
 179       0 mmcblk0 287277 162611 16233367 1243501 473290 864375 17033130 13592893 0 3950880 14836394 0 0 0 0 0 0
 179       1 mmcblk0p1 204 1019 12526 1072 2 0 2 0 0 650 1072 0 0 0 0 0 0
 179       2 mmcblk0p2 286991 161592 16216313 1242349 473288 864375 17033128 13592893 0 3950750 14835242 0 0 0 0 0 0
",
        );

        fs.add_file(
            "/proc/meminfo",
            "\
MemTotal:         992964 kB
MemFree:          121304 kB
MemAvailable:     598460 kB
Buffers:           72056 kB
Cached:           465708 kB
SwapCached:         1180 kB
Active:           465464 kB
Inactive:         275236 kB
SwapTotal:        102396 kB
SwapFree:          91132 kB
Dirty:                68 kB
Writeback:             0 kB
AnonPages:        201840 kB
Mapped:           117320 kB
Shmem:             14516 kB
Slab:              71484 kB
SReclaimable:      38552 kB
SUnreclaim:        32932 kB
CmaTotal:           8192 kB
CmaFree:            5952 kB
HugePages_Total:       0
Hugepagesize:       2048 kB
",
        );

        let wired: Vec<(&str, u64)> = NETWORK_COUNTERS
            .iter()
            .enumerate()
            .map(|(i, name)| (*name, (i as u64) * 1000))
            .collect();
        fs.add_interface("/sys", "eth0", "1000", &wired);
        fs.add_file("/sys/class/net/eth0/address", "b8:27:eb:12:34:56\n");

        let wireless: Vec<(&str, u64)> = NETWORK_COUNTERS
            .iter()
            .map(|name| (*name, 7))
            .collect();
        // Wireless drivers reject reads of `speed`, modelled by leaving it out.
        fs.add_interface("/sys", "wlan0", "", &wireless);
        fs.remove_file("/sys/class/net/wlan0/speed");
        fs.add_file("/sys/class/net/wlan0/address", "b8:27:eb:ab:cd:ef\n");

        fs.add_file("/sys/class/thermal/thermal_zone0/temp", "48312\n");

        fs
    }

    /// Replaces `/proc/stat` with the given per-line counters.
    ///
    /// The first entry is written as the aggregate `cpu` line, the rest as
    /// `cpu0`, `cpu1`, ...
    pub fn set_cpu_counters(&self, lines: &[[u64; 10]]) {
        let mut content = String::new();
        for (i, counters) in lines.iter().enumerate() {
            let label = if i == 0 {
                "cpu ".to_string()
            } else {
                format!("cpu{}", i - 1)
            };
            let values: Vec<String> = counters.iter().map(|v| v.to_string()).collect();
            content.push_str(&format!("{} {}\n", label, values.join(" ")));
        }
        content.push_str("ctxt 103719283\n");
        self.add_file("/proc/stat", content);
    }
}
