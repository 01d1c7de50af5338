/// Usage text for the base `google_analytics` tool.
pub const HELP: &str = r##"
Help:

google_analytics(op="status")
    Show connection status.

google_analytics(op="listProperties")
    List all GA4 properties you have access to.

google_analytics(op="getReport", args={
    "propertyId": "123456",
    "dateRange": "last30days",  # today, yesterday, last7days, last28days, last30days, last90days
    "metrics": ["totalUsers", "sessions", "screenPageViews"],
    "dimensions": ["date"],
    "limit": 100
})
    Run a GA4 report. propertyId defaults to GA_DEFAULT_PROPERTY from setup.
    Pass "startDate" and "endDate" (YYYY-MM-DD) instead of dateRange for a custom window.
"##;

/// Usage text for `google_analytics_enhanced`.
pub const ENHANCED_HELP: &str = r##"
Enhanced Google Analytics Help:

google_analytics_enhanced(op="status")
    Show connection status.

# Event Tracking Setup
google_analytics_enhanced(op="getEventConfig", args={
    "propertyId": "123456",
    "eventName": "purchase"
})
    Get configuration for a specific event.

google_analytics_enhanced(op="listEvents", args={
    "propertyId": "123456",
    "dateRange": "last7days"
})
    List all events tracked in the property.

google_analytics_enhanced(op="getEventReport", args={
    "propertyId": "123456",
    "eventName": "purchase",
    "dateRange": "last30days",
    "dimensions": ["date", "eventName"],
    "metrics": ["eventCount", "eventValue"]
})
    Get detailed event analytics.

# Conversion Tracking
google_analytics_enhanced(op="getConversions", args={
    "propertyId": "123456",
    "dateRange": "last30days",
    "dimensions": ["sessionSource", "sessionMedium"]
})
    Get conversion metrics with breakdown.

# E-commerce Tracking
google_analytics_enhanced(op="getEcommerceReport", args={
    "propertyId": "123456",
    "dateRange": "last30days",
    "dimensions": ["itemName", "itemCategory"]
})
    Get e-commerce performance metrics.

# User Journey & Funnels
google_analytics_enhanced(op="getUserJourney", args={
    "propertyId": "123456",
    "dateRange": "last7days",
    "startPage": "/",
    "endPage": "/checkout/complete"
})
    Analyze user journey from start to end page.

google_analytics_enhanced(op="getFunnelReport", args={
    "propertyId": "123456",
    "funnelSteps": [
        {"name": "Home", "page": "/"},
        {"name": "Product", "page": "/product"},
        {"name": "Cart", "page": "/cart"},
        {"name": "Checkout", "page": "/checkout"}
    ],
    "dateRange": "last30days"
})
    Analyze conversion funnel with drop-off rates.

# Custom Reports
google_analytics_enhanced(op="customQuery", args={
    "propertyId": "123456",
    "dateRange": "last30days",
    "metrics": ["sessions", "conversions"],
    "dimensions": ["deviceCategory", "browser"],
    "filters": [
        {"field": "country", "operator": "EQUALS", "value": "United States"}
    ],
    "orderBy": {"metric": "sessions", "desc": True},
    "limit": 50
})
    Execute a custom analytics query with filters.

# Recommended Events for Different Industries:

E-commerce:
- page_view, view_item, add_to_cart, remove_from_cart
- begin_checkout, add_payment_info, add_shipping_info
- purchase, refund

Lead Generation:
- page_view, generate_lead, form_submit, sign_up
- contact_submit, download_brochure

Content/Media:
- page_view, video_start, video_progress, video_complete
- file_download, search, share

SaaS:
- page_view, sign_up, login, trial_start
- upgrade, feature_usage, subscription_cancel
"##;
