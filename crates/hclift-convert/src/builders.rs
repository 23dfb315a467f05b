//! Builder type registry
//!
//! Every builder in a template must name a known type; an unknown type aborts
//! the conversion.

use phf::phf_set;
use std::collections::HashSet;

/// Builder types shipped with the legacy tool
static BUILTIN: phf::Set<&'static str> = phf_set! {
    "alicloud-ecs",
    "amazon-chroot",
    "amazon-ebs",
    "amazon-ebssurrogate",
    "amazon-ebsvolume",
    "amazon-instance",
    "azure-arm",
    "azure-chroot",
    "azure-dtl",
    "cloudstack",
    "digitalocean",
    "docker",
    "file",
    "googlecompute",
    "hcloud",
    "hyperone",
    "hyperv-iso",
    "hyperv-vmcx",
    "jdcloud",
    "linode",
    "lxc",
    "lxd",
    "ncloud",
    "null",
    "oneandone",
    "openstack",
    "oracle-classic",
    "oracle-oci",
    "osc-bsu",
    "osc-bsusurrogate",
    "osc-bsuvolume",
    "osc-chroot",
    "parallels-iso",
    "parallels-pvm",
    "profitbricks",
    "proxmox",
    "proxmox-clone",
    "proxmox-iso",
    "qemu",
    "scaleway",
    "tencentcloud-cvm",
    "triton",
    "ucloud-uhost",
    "vagrant",
    "virtualbox-iso",
    "virtualbox-ovf",
    "virtualbox-vm",
    "vmware-iso",
    "vmware-vmx",
    "vsphere-clone",
    "vsphere-iso",
    "yandex",
};

/// Answers whether a builder type exists
pub trait BuilderRegistry {
    fn has(&self, builder_type: &str) -> bool;
}

impl BuilderRegistry for HashSet<String> {
    fn has(&self, builder_type: &str) -> bool {
        self.contains(builder_type)
    }
}

/// Built-in builder types plus user-supplied ones
#[derive(Debug, Clone, Default)]
pub struct KnownBuilders {
    extra: HashSet<String>,
}

impl KnownBuilders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also accept the given builder types (plugins)
    pub fn with_extra<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extra: extra.into_iter().map(Into::into).collect(),
        }
    }

    /// Built-in types, sorted
    pub fn builtin() -> Vec<&'static str> {
        let mut types: Vec<&'static str> = BUILTIN.iter().copied().collect();
        types.sort_unstable();
        types
    }
}

impl BuilderRegistry for KnownBuilders {
    fn has(&self, builder_type: &str) -> bool {
        BUILTIN.contains(builder_type) || self.extra.contains(builder_type)
    }
}
