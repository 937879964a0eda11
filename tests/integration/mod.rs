mod pagination;
mod scim_protocol;
