//! Absolute paths of the base system tools jmgr drives.

pub const JAIL: &str = "/usr/sbin/jail";
pub const JLS: &str = "/usr/sbin/jls";
pub const JEXEC: &str = "/usr/sbin/jexec";
pub const SYSRC: &str = "/usr/sbin/sysrc";
pub const SYSCTL: &str = "/sbin/sysctl";
pub const ZFS: &str = "/sbin/zfs";
pub const TAR: &str = "/usr/bin/tar";
pub const CHFLAGS: &str = "/bin/chflags";
pub const RM: &str = "/bin/rm";
pub const PING: &str = "/sbin/ping";
pub const IFCONFIG: &str = "/sbin/ifconfig";
pub const UNAME: &str = "/usr/bin/uname";
pub const FETCH: &str = "/usr/bin/fetch";
pub const ENV: &str = "/usr/bin/env";
pub const FREEBSD_VERSION: &str = "/bin/freebsd-version";
pub const FREEBSD_UPDATE: &str = "/usr/sbin/freebsd-update";
pub const PKG: &str = "/usr/sbin/pkg";
