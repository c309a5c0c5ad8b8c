//! Status page HTML.

use axum::{http::StatusCode, response::Html};

/// Serve the status page.
pub async fn index() -> Result<Html<&'static str>, StatusCode> {
    Ok(Html(HTML_CONTENT))
}

const HTML_CONTENT: &str = r#"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>ceton-proxy tuners</title>
    <style>
        * { margin: 0; padding: 0; box-sizing: border-box; }

        body {
            font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif;
            background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
            min-height: 100vh;
            padding: 20px;
        }

        .container { max-width: 1400px; margin: 0 auto; }

        header {
            background: rgba(255, 255, 255, 0.95);
            padding: 15px 20px;
            border-radius: 8px 8px 0 0;
            box-shadow: 0 2px 10px rgba(0, 0, 0, 0.1);
            display: flex;
            justify-content: space-between;
            align-items: center;
        }

        h1 { color: #333; font-size: 24px; }
        .subtitle { color: #666; font-size: 13px; }

        .content { background: white; padding: 20px; border-radius: 0 0 8px 8px; box-shadow: 0 2px 10px rgba(0, 0, 0, 0.1); }

        .stats-grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(200px, 1fr)); gap: 15px; margin-bottom: 20px; }
        .stat-card { background: #f8f9fa; padding: 15px; border-radius: 8px; text-align: center; }
        .stat-label { color: #666; font-size: 11px; text-transform: uppercase; letter-spacing: 1px; margin-bottom: 5px; }
        .stat-value { color: #333; font-size: 24px; font-weight: bold; }

        table { width: 100%; border-collapse: collapse; }
        th { background: #f5f5f5; padding: 10px 12px; text-align: left; font-weight: 600; color: #333; border-bottom: 2px solid #ddd; font-size: 13px; }
        td { padding: 10px 12px; border-bottom: 1px solid #eee; color: #555; font-size: 13px; }
        tr:hover { background: #f9f9f9; }
        code { background: #f0f0f0; padding: 2px 6px; border-radius: 3px; font-size: 12px; }

        .btn { display: inline-block; padding: 6px 12px; border: none; border-radius: 4px; cursor: pointer; font-size: 12px; }
        .btn-primary { background: #667eea; color: white; }
        .btn-primary:hover { background: #5a6fd6; }

        .badge { display: inline-block; padding: 3px 10px; border-radius: 20px; font-size: 11px; font-weight: 600; }
        .badge-success { background: #d4edda; color: #155724; }
        .badge-danger { background: #f8d7da; color: #721c24; }
        .badge-warning { background: #fff3cd; color: #856404; }
        .badge-info { background: #d1ecf1; color: #0c5460; }

        .empty-state { text-align: center; color: #999; padding: 30px; }
    </style>
</head>
<body>
    <div class="container">
        <header>
            <div>
                <h1>ceton-proxy</h1>
                <div class="subtitle">Ceton tuner allocation</div>
            </div>
            <button class="btn btn-primary" onclick="reconcile()">Reconcile</button>
        </header>
        <div class="content">
            <div class="stats-grid">
                <div class="stat-card"><div class="stat-label">Tuners</div><div class="stat-value" id="stat-total">-</div></div>
                <div class="stat-card"><div class="stat-label">Active</div><div class="stat-value" id="stat-active">-</div></div>
                <div class="stat-card"><div class="stat-label">External</div><div class="stat-value" id="stat-external">-</div></div>
                <div class="stat-card"><div class="stat-label">Stop pending</div><div class="stat-value" id="stat-pending">-</div></div>
            </div>
            <table id="tuners-table">
                <thead>
                    <tr>
                        <th>#</th><th>Device</th><th>Status</th><th>Transport</th><th>Channel</th>
                        <th>Level</th><th>SNR</th><th>Destination</th>
                    </tr>
                </thead>
                <tbody id="tuners-body">
                    <tr><td colspan="8" class="empty-state">Loading...</td></tr>
                </tbody>
            </table>
        </div>
    </div>

    <script>
        function escapeHtml(str) {
            if (!str) return '';
            return String(str).replace(/[&<>"']/g, m => ({'&':'&amp;','<':'&lt;','>':'&gt;','"':'&quot;',"'":'&#39;'})[m]);
        }

        function statusBadge(status) {
            const classes = { Inactive: 'badge-info', Active: 'badge-success', StopPending: 'badge-warning', External: 'badge-danger' };
            return `<span class="badge ${classes[status] || ''}">${escapeHtml(status)}</span>`;
        }

        function transportText(t) {
            if (!t) return '-';
            return t.state === 'stopped' ? 'STOPPED' : t.raw;
        }

        function render(data) {
            const tuners = data.tuners || [];
            const count = s => tuners.filter(t => t.status === s).length;
            document.getElementById('stat-total').textContent = tuners.length;
            document.getElementById('stat-active').textContent = count('Active');
            document.getElementById('stat-external').textContent = count('External');
            document.getElementById('stat-pending').textContent = count('StopPending');

            const tbody = document.getElementById('tuners-body');
            if (tuners.length === 0) {
                tbody.innerHTML = '<tr><td colspan="8" class="empty-state">No tuners</td></tr>';
                return;
            }
            tbody.innerHTML = tuners.map(t => `
                <tr>
                    <td>${t.index}</td>
                    <td>${escapeHtml(t.device_address)} <span style="color:#999;font-size:11px">#${t.instance} ${escapeHtml(t.delivery)}</span></td>
                    <td>${statusBadge(t.status)}${t.device_busy ? ' <span class="badge badge-warning">busy</span>' : ''}</td>
                    <td>${escapeHtml(transportText(t.signal.transport))}</td>
                    <td>${escapeHtml(t.signal.channel || '-')}</td>
                    <td>${escapeHtml(t.signal.level || '-')}</td>
                    <td>${escapeHtml(t.signal.snr || '-')}</td>
                    <td><code>${escapeHtml(t.destination)}</code></td>
                </tr>
            `).join('');
        }

        async function refreshTuners() {
            try {
                const res = await fetch('/api/tuners');
                render(await res.json());
            } catch (e) { console.error('Failed to refresh tuners:', e); }
        }

        async function reconcile() {
            try {
                const res = await fetch('/api/tuners/reconcile', { method: 'POST' });
                render(await res.json());
            } catch (e) { console.error('Failed to reconcile tuners:', e); }
        }

        refreshTuners();
        setInterval(refreshTuners, 5000);
    </script>
</body>
</html>
"#;
